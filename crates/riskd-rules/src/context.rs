//! Per-account evaluation snapshot.

use chrono::{DateTime, Utc};
use riskd_core::{
    AccountId, DailyCounters, LockoutRecord, Order, Position, UnrealizedPnl,
};
use rust_decimal::Decimal;

/// Owned snapshot of one account's state at one event instant.
///
/// Assembled by the router without holding state locks during
/// evaluation; rules read it as a pure input.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub account_id: AccountId,
    pub positions: Vec<Position>,
    pub open_orders: Vec<Order>,
    pub daily: DailyCounters,
    pub unrealized: UnrealizedPnl,
    /// Trades recorded inside the frequency rule's window.
    pub trades_in_window: u64,
    pub lockout: Option<LockoutRecord>,
    pub now: DateTime<Utc>,
    /// Next trading-day boundary, for lockout-until-reset decisions.
    pub next_reset: Option<DateTime<Utc>>,
}

impl RuleContext {
    /// Absolute signed net exposure across positions.
    pub fn net_contracts(&self) -> Decimal {
        self.positions
            .iter()
            .map(|p| p.signed_size())
            .sum::<Decimal>()
            .abs()
    }

    /// Sum of position magnitudes.
    pub fn gross_contracts(&self) -> Decimal {
        self.positions.iter().map(|p| p.size.inner()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use riskd_core::{ContractId, PositionSide, Price, Size};
    use rust_decimal_macros::dec;

    fn position(contract: &str, side: PositionSide, size: Decimal) -> Position {
        Position {
            account_id: AccountId::from("acct-1"),
            contract_id: ContractId::from(contract),
            side,
            size: Size::new(size),
            average_price: Price::new(dec!(5000)),
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn net_offsets_gross_sums() {
        let ctx = RuleContext {
            account_id: AccountId::from("acct-1"),
            positions: vec![
                position("ESZ6", PositionSide::Long, dec!(4)),
                position("NQZ6", PositionSide::Short, dec!(3)),
            ],
            open_orders: Vec::new(),
            daily: DailyCounters::new(AccountId::from("acct-1"), Utc::now().date_naive()),
            unrealized: UnrealizedPnl::default(),
            trades_in_window: 0,
            lockout: None,
            now: Utc::now(),
            next_reset: None,
        };
        assert_eq!(ctx.net_contracts(), dec!(1));
        assert_eq!(ctx.gross_contracts(), dec!(7));
    }
}
