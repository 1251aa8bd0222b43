//! Lockout records: per-account trading restrictions.

use crate::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lockout severity.
///
/// `Permanent` requires explicit administrative release; it is never
/// cleared by an expiry sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockoutKind {
    Temporary,
    Permanent,
}

impl fmt::Display for LockoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary => write!(f, "temporary"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// A durable per-account trading restriction.
///
/// A Temporary record always carries a future `expires_at` at creation;
/// a Permanent record never has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutRecord {
    pub account_id: AccountId,
    pub kind: LockoutKind,
    pub reason: String,
    pub applied_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl LockoutRecord {
    /// Whether this record has lapsed at `now`.
    ///
    /// Permanent records never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.kind {
            LockoutKind::Permanent => false,
            LockoutKind::Temporary => self.expires_at.is_some_and(|t| now >= t),
        }
    }
}
