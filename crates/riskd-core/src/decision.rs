//! Enforcement decisions produced by rule evaluation.

use crate::{AccountId, ContractId, LockoutKind, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The corrective action a rule mandates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EnforcementAction {
    /// Flatten one contract.
    ClosePosition { contract_id: ContractId },
    /// Flatten every open position for the account.
    CloseAllPositions,
    /// Reduce one contract's position to a target magnitude.
    ReduceToLimit {
        contract_id: ContractId,
        target_size: Size,
    },
    /// Cancel working orders, optionally scoped to one contract.
    CancelOrders { contract_id: Option<ContractId> },
    /// Restrict further trading for the account.
    ApplyLockout {
        kind: LockoutKind,
        /// Expiry for Temporary lockouts; None for Permanent.
        until: Option<DateTime<Utc>>,
        reason: String,
    },
}

impl EnforcementAction {
    /// Severity rank for conflict resolution between position actions.
    ///
    /// Higher wins when two rules target the same contract on one event:
    /// CloseAllPositions > ClosePosition > ReduceToLimit > CancelOrders.
    /// Lockouts are merged separately (Permanent > longer Temporary).
    pub fn severity(&self) -> u8 {
        match self {
            Self::CancelOrders { .. } => 1,
            Self::ReduceToLimit { .. } => 2,
            Self::ClosePosition { .. } => 3,
            Self::CloseAllPositions => 4,
            Self::ApplyLockout { .. } => 5,
        }
    }

    pub fn is_lockout(&self) -> bool {
        matches!(self, Self::ApplyLockout { .. })
    }

    /// Contract this action is scoped to, if any.
    pub fn contract_scope(&self) -> Option<&ContractId> {
        match self {
            Self::ClosePosition { contract_id } => Some(contract_id),
            Self::ReduceToLimit { contract_id, .. } => Some(contract_id),
            Self::CancelOrders { contract_id } => contract_id.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClosePosition { contract_id } => write!(f, "close_position({contract_id})"),
            Self::CloseAllPositions => write!(f, "close_all_positions"),
            Self::ReduceToLimit {
                contract_id,
                target_size,
            } => write!(f, "reduce_to_limit({contract_id}, {target_size})"),
            Self::CancelOrders { contract_id: None } => write!(f, "cancel_orders(*)"),
            Self::CancelOrders {
                contract_id: Some(c),
            } => write!(f, "cancel_orders({c})"),
            Self::ApplyLockout { kind, .. } => write!(f, "apply_lockout({kind})"),
        }
    }
}

/// A rule's verdict for one account at one event instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementDecision {
    /// Name of the rule that fired.
    pub rule: String,
    pub account_id: AccountId,
    pub action: EnforcementAction,
}

impl fmt::Display for EnforcementDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.rule, self.account_id, self.action)
    }
}
