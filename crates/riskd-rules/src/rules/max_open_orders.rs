//! Working-order cap.

use riskd_core::{EnforcementAction, EnforcementDecision};

use crate::config::MaxOpenOrdersConfig;
use crate::context::RuleContext;
use crate::engine::RiskRule;

pub struct MaxOpenOrdersRule {
    config: MaxOpenOrdersConfig,
}

impl MaxOpenOrdersRule {
    pub fn new(config: MaxOpenOrdersConfig) -> Self {
        Self { config }
    }
}

impl RiskRule for MaxOpenOrdersRule {
    fn name(&self) -> &'static str {
        "max_open_orders"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<EnforcementDecision> {
        if !self.config.enabled || ctx.open_orders.len() <= self.config.limit {
            return Vec::new();
        }
        vec![EnforcementDecision {
            rule: self.name().to_string(),
            account_id: ctx.account_id.clone(),
            action: EnforcementAction::CancelOrders { contract_id: None },
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use riskd_core::{
        AccountId, ContractId, DailyCounters, Order, OrderId, OrderSide, OrderStatus, OrderType,
        Size, UnrealizedPnl,
    };
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order {
            account_id: AccountId::from("acct-1"),
            contract_id: ContractId::from("ESZ6"),
            order_id: OrderId::new(),
            side: OrderSide::Buy,
            size: Size::new(dec!(1)),
            order_type: OrderType::Limit,
            limit_price: None,
            stop_price: None,
            status: OrderStatus::Working,
            filled_size: Size::ZERO,
            fill_price: None,
            created_at: Utc::now(),
        }
    }

    fn ctx(open_orders: usize) -> RuleContext {
        RuleContext {
            account_id: AccountId::from("acct-1"),
            positions: Vec::new(),
            open_orders: (0..open_orders).map(|_| order()).collect(),
            daily: DailyCounters::new(AccountId::from("acct-1"), Utc::now().date_naive()),
            unrealized: UnrealizedPnl::default(),
            trades_in_window: 0,
            lockout: None,
            now: Utc::now(),
            next_reset: None,
        }
    }

    #[test]
    fn over_the_cap_cancels_working_orders() {
        let rule = MaxOpenOrdersRule::new(MaxOpenOrdersConfig {
            enabled: true,
            limit: 3,
        });
        let decisions = rule.evaluate(&ctx(4));
        assert_eq!(decisions.len(), 1);
        assert_eq!(
            decisions[0].action,
            EnforcementAction::CancelOrders { contract_id: None }
        );
        assert!(rule.evaluate(&ctx(3)).is_empty());
    }
}
