//! Per-account daily aggregates.

use crate::{AccountId, ContractId, Money};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily counters scoped to exactly one trading-calendar day per account.
///
/// Reset exactly once per trading-day boundary by the reset scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCounters {
    pub account_id: AccountId,
    /// Trading day these counters belong to (account's reset timezone).
    pub date: NaiveDate,
    pub realized_pnl: Money,
    pub trade_count: u64,
    /// Trades closed at a loss.
    pub loss_count: u64,
}

impl DailyCounters {
    pub fn new(account_id: AccountId, date: NaiveDate) -> Self {
        Self {
            account_id,
            date,
            realized_pnl: Money::ZERO,
            trade_count: 0,
            loss_count: 0,
        }
    }
}

/// Unrealized PnL summed over open positions.
///
/// Positions with a stale quote or missing metadata are excluded and the
/// result flagged `partial` rather than failing the whole computation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnrealizedPnl {
    pub total: Money,
    /// Contracts excluded for stale/missing market data.
    pub excluded: Vec<ContractId>,
    pub partial: bool,
}

impl UnrealizedPnl {
    pub fn exclude(&mut self, contract: ContractId) {
        self.excluded.push(contract);
        self.partial = true;
    }
}
