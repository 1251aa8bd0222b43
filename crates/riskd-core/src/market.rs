//! Market data types: quotes, contract metadata, executed trades.

use crate::{AccountId, ContractId, Money, OrderSide, Price, Size};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest top-of-book snapshot for one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub contract_id: ContractId,
    pub bid: Price,
    pub ask: Price,
    pub last: Price,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    /// Age of this quote in milliseconds relative to `now`.
    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.observed_at).num_milliseconds()
    }

    /// Whether the quote is older than `threshold` at `now`.
    pub fn is_stale(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        now - self.observed_at > threshold
    }

    /// Mid price: (bid + ask) / 2.
    pub fn mid(&self) -> Price {
        Price::new((self.bid.inner() + self.ask.inner()) / Decimal::TWO)
    }
}

/// Instrument metadata used for PnL conversion.
///
/// Valid while `now < fetched_at + ttl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub contract_id: ContractId,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Currency value of one tick for one contract.
    pub tick_value: Money,
    pub fetched_at: DateTime<Utc>,
    /// Cache lifetime in seconds.
    pub ttl_secs: u64,
}

impl ContractMetadata {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.fetched_at + Duration::seconds(self.ttl_secs as i64)
    }

    /// Currency value of a one-point price move for one contract.
    ///
    /// Returns None when tick_size is zero (malformed metadata).
    pub fn point_value(&self) -> Option<Decimal> {
        if self.tick_size.is_zero() {
            return None;
        }
        Some(self.tick_value.inner() / self.tick_size.inner())
    }
}

/// An executed trade reported by the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub account_id: AccountId,
    pub contract_id: ContractId,
    pub side: OrderSide,
    pub size: Size,
    pub price: Price,
    /// Realized PnL attributed to this trade (zero for opening trades).
    pub realized_pnl: Money,
    pub fees: Money,
    pub executed_at: DateTime<Utc>,
}
