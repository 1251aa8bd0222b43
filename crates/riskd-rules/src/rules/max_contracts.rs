//! Position size cap: net or gross exposure over the limit.

use chrono::Duration;
use rust_decimal::Decimal;

use riskd_core::{EnforcementAction, EnforcementDecision, LockoutKind, Size};

use crate::config::{CountType, MaxContractsConfig};
use crate::context::RuleContext;
use crate::engine::RiskRule;

pub struct MaxContractsRule {
    config: MaxContractsConfig,
}

impl MaxContractsRule {
    pub fn new(config: MaxContractsConfig) -> Self {
        Self { config }
    }
}

impl RiskRule for MaxContractsRule {
    fn name(&self) -> &'static str {
        "max_contracts"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<EnforcementDecision> {
        if !self.config.enabled {
            return Vec::new();
        }
        let exposure = match self.config.count_type {
            CountType::Net => ctx.net_contracts(),
            CountType::Gross => ctx.gross_contracts(),
        };
        let limit = self.config.limit.inner();
        if exposure <= limit {
            return Vec::new();
        }

        let action = if self.config.close_all {
            EnforcementAction::CloseAllPositions
        } else {
            // Reduce the largest position by the excess over the limit.
            let Some(largest) = ctx.positions.iter().max_by_key(|p| p.size) else {
                return Vec::new();
            };
            let target = (largest.size.inner() - (exposure - limit)).max(Decimal::ZERO);
            EnforcementAction::ReduceToLimit {
                contract_id: largest.contract_id.clone(),
                target_size: Size::new(target),
            }
        };

        let mut decisions = vec![EnforcementDecision {
            rule: self.name().to_string(),
            account_id: ctx.account_id.clone(),
            action,
        }];
        if self.config.lockout_on_breach {
            decisions.push(EnforcementDecision {
                rule: self.name().to_string(),
                account_id: ctx.account_id.clone(),
                action: EnforcementAction::ApplyLockout {
                    kind: LockoutKind::Temporary,
                    until: Some(ctx.now + Duration::seconds(self.config.lockout_secs as i64)),
                    reason: format!("contract limit breached: {exposure} > {limit}"),
                },
            });
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use riskd_core::{
        AccountId, ContractId, DailyCounters, Position, PositionSide, Price, UnrealizedPnl,
    };
    use rust_decimal_macros::dec;

    fn ctx(positions: Vec<Position>) -> RuleContext {
        RuleContext {
            account_id: AccountId::from("acct-1"),
            positions,
            open_orders: Vec::new(),
            daily: DailyCounters::new(AccountId::from("acct-1"), Utc::now().date_naive()),
            unrealized: UnrealizedPnl::default(),
            trades_in_window: 0,
            lockout: None,
            now: Utc::now(),
            next_reset: None,
        }
    }

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

    fn config(limit: Decimal, count_type: CountType, close_all: bool) -> MaxContractsConfig {
        MaxContractsConfig {
            enabled: true,
            limit: Size::new(limit),
            count_type,
            close_all,
            ..Default::default()
        }
    }

    #[test]
    fn net_six_over_limit_five_reduces_to_five() {
        let rule = MaxContractsRule::new(config(dec!(5), CountType::Net, false));
        let decisions = rule.evaluate(&ctx(vec![position(
            "ESZ6",
            PositionSide::Long,
            dec!(6),
        )]));
        assert_eq!(decisions.len(), 1);
        assert_eq!(
            decisions[0].action,
            EnforcementAction::ReduceToLimit {
                contract_id: ContractId::from("ESZ6"),
                target_size: Size::new(dec!(5)),
            }
        );
    }

    #[test]
    fn close_all_flag_flattens_instead() {
        let rule = MaxContractsRule::new(config(dec!(5), CountType::Net, true));
        let decisions = rule.evaluate(&ctx(vec![position(
            "ESZ6",
            PositionSide::Long,
            dec!(6),
        )]));
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].action, EnforcementAction::CloseAllPositions);
    }

    #[test]
    fn net_counting_offsets_opposing_sides() {
        let rule = MaxContractsRule::new(config(dec!(5), CountType::Net, false));
        // 4 long + 3 short nets to 1: no breach.
        let decisions = rule.evaluate(&ctx(vec![
            position("ESZ6", PositionSide::Long, dec!(4)),
            position("NQZ6", PositionSide::Short, dec!(3)),
        ]));
        assert!(decisions.is_empty());
    }

    #[test]
    fn gross_counting_sums_magnitudes() {
        let rule = MaxContractsRule::new(config(dec!(5), CountType::Gross, false));
        // Gross 7 over limit 5: reduce the larger position by 2.
        let decisions = rule.evaluate(&ctx(vec![
            position("ESZ6", PositionSide::Long, dec!(4)),
            position("NQZ6", PositionSide::Short, dec!(3)),
        ]));
        assert_eq!(
            decisions[0].action,
            EnforcementAction::ReduceToLimit {
                contract_id: ContractId::from("ESZ6"),
                target_size: Size::new(dec!(2)),
            }
        );
    }

    #[test]
    fn lockout_on_breach_adds_temporary_lockout() {
        let mut cfg = config(dec!(5), CountType::Net, true);
        cfg.lockout_on_breach = true;
        let rule = MaxContractsRule::new(cfg);
        let decisions = rule.evaluate(&ctx(vec![position(
            "ESZ6",
            PositionSide::Long,
            dec!(6),
        )]));
        assert_eq!(decisions.len(), 2);
        assert!(matches!(
            decisions[1].action,
            EnforcementAction::ApplyLockout {
                kind: LockoutKind::Temporary,
                until: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn at_the_limit_is_not_a_breach() {
        let rule = MaxContractsRule::new(config(dec!(5), CountType::Net, false));
        let decisions = rule.evaluate(&ctx(vec![position(
            "ESZ6",
            PositionSide::Long,
            dec!(5),
        )]));
        assert!(decisions.is_empty());
    }

    #[test]
    fn disabled_rule_never_fires() {
        let mut cfg = config(dec!(5), CountType::Net, false);
        cfg.enabled = false;
        let rule = MaxContractsRule::new(cfg);
        let decisions = rule.evaluate(&ctx(vec![position(
            "ESZ6",
            PositionSide::Long,
            dec!(100),
        )]));
        assert!(decisions.is_empty());
    }
}
