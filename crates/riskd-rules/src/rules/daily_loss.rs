//! Daily loss limit: realized (optionally plus unrealized) PnL floor.

use riskd_core::{EnforcementAction, EnforcementDecision, LockoutKind};

use crate::config::DailyLossConfig;
use crate::context::RuleContext;
use crate::engine::RiskRule;

pub struct DailyLossRule {
    config: DailyLossConfig,
}

impl DailyLossRule {
    pub fn new(config: DailyLossConfig) -> Self {
        Self { config }
    }
}

impl RiskRule for DailyLossRule {
    fn name(&self) -> &'static str {
        "daily_loss"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<EnforcementDecision> {
        if !self.config.enabled {
            return Vec::new();
        }
        let mut total = ctx.daily.realized_pnl;
        if self.config.include_unrealized {
            total += ctx.unrealized.total;
        }
        if total > -self.config.limit {
            return Vec::new();
        }

        let mut decisions = vec![EnforcementDecision {
            rule: self.name().to_string(),
            account_id: ctx.account_id.clone(),
            action: EnforcementAction::CloseAllPositions,
        }];
        if self.config.lockout_until_reset {
            // Without a computable next boundary the account cannot be
            // given a bounded cooldown; lock it out until released.
            let (kind, until) = match ctx.next_reset {
                Some(at) => (LockoutKind::Temporary, Some(at)),
                None => (LockoutKind::Permanent, None),
            };
            decisions.push(EnforcementDecision {
                rule: self.name().to_string(),
                account_id: ctx.account_id.clone(),
                action: EnforcementAction::ApplyLockout {
                    kind,
                    until,
                    reason: format!(
                        "daily loss limit breached: {total} <= -{}",
                        self.config.limit
                    ),
                },
            });
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use riskd_core::{AccountId, DailyCounters, Money, UnrealizedPnl};
    use rust_decimal_macros::dec;

    fn ctx(realized: Money, unrealized: Money) -> RuleContext {
        let account = AccountId::from("acct-1");
        let mut daily = DailyCounters::new(account.clone(), Utc::now().date_naive());
        daily.realized_pnl = realized;
        RuleContext {
            account_id: account,
            positions: Vec::new(),
            open_orders: Vec::new(),
            daily,
            unrealized: UnrealizedPnl {
                total: unrealized,
                excluded: Vec::new(),
                partial: false,
            },
            trades_in_window: 0,
            lockout: None,
            now: Utc::now(),
            next_reset: Some(Utc::now() + Duration::hours(6)),
        }
    }

    fn config(limit: Money, include_unrealized: bool) -> DailyLossConfig {
        DailyLossConfig {
            enabled: true,
            limit,
            include_unrealized,
            lockout_until_reset: true,
        }
    }

    #[test]
    fn breach_closes_all_and_locks_until_reset() {
        let rule = DailyLossRule::new(config(Money::new(dec!(500)), false));
        let context = ctx(Money::new(dec!(-600)), Money::ZERO);
        let decisions = rule.evaluate(&context);

        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].action, EnforcementAction::CloseAllPositions);
        assert!(matches!(
            &decisions[1].action,
            EnforcementAction::ApplyLockout {
                kind: LockoutKind::Temporary,
                until: Some(u),
                ..
            } if Some(*u) == context.next_reset
        ));
    }

    #[test]
    fn exactly_at_the_limit_is_a_breach() {
        let rule = DailyLossRule::new(config(Money::new(dec!(500)), false));
        assert!(!rule.evaluate(&ctx(Money::new(dec!(-500)), Money::ZERO)).is_empty());
        assert!(rule.evaluate(&ctx(Money::new(dec!(-499.99)), Money::ZERO)).is_empty());
    }

    #[test]
    fn unrealized_included_only_when_configured() {
        let realized = Money::new(dec!(-300));
        let unrealized = Money::new(dec!(-300));

        let excluding = DailyLossRule::new(config(Money::new(dec!(500)), false));
        assert!(excluding.evaluate(&ctx(realized, unrealized)).is_empty());

        let including = DailyLossRule::new(config(Money::new(dec!(500)), true));
        assert_eq!(including.evaluate(&ctx(realized, unrealized)).len(), 2);
    }

    #[test]
    fn missing_next_reset_escalates_to_permanent() {
        let rule = DailyLossRule::new(config(Money::new(dec!(500)), false));
        let mut context = ctx(Money::new(dec!(-600)), Money::ZERO);
        context.next_reset = None;
        let decisions = rule.evaluate(&context);
        assert!(matches!(
            decisions[1].action,
            EnforcementAction::ApplyLockout {
                kind: LockoutKind::Permanent,
                until: None,
                ..
            }
        ));
    }

    #[test]
    fn lockout_can_be_disabled() {
        let mut cfg = config(Money::new(dec!(500)), false);
        cfg.lockout_until_reset = false;
        let rule = DailyLossRule::new(cfg);
        let decisions = rule.evaluate(&ctx(Money::new(dec!(-600)), Money::ZERO));
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].action, EnforcementAction::CloseAllPositions);
    }
}
