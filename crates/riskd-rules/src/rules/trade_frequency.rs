//! Trade frequency cap: too many trades inside a sliding window.

use chrono::Duration;

use riskd_core::{EnforcementAction, EnforcementDecision, LockoutKind};

use crate::config::TradeFrequencyConfig;
use crate::context::RuleContext;
use crate::engine::RiskRule;

pub struct TradeFrequencyRule {
    config: TradeFrequencyConfig,
}

impl TradeFrequencyRule {
    pub fn new(config: TradeFrequencyConfig) -> Self {
        Self { config }
    }

    pub fn window(&self) -> Duration {
        Duration::seconds(self.config.window_secs as i64)
    }
}

impl RiskRule for TradeFrequencyRule {
    fn name(&self) -> &'static str {
        "trade_frequency"
    }

    fn evaluate(&self, ctx: &RuleContext) -> Vec<EnforcementDecision> {
        if !self.config.enabled || ctx.trades_in_window <= self.config.max_trades {
            return Vec::new();
        }
        vec![EnforcementDecision {
            rule: self.name().to_string(),
            account_id: ctx.account_id.clone(),
            action: EnforcementAction::ApplyLockout {
                kind: LockoutKind::Temporary,
                until: Some(ctx.now + Duration::seconds(self.config.cooldown_secs as i64)),
                reason: format!(
                    "{} trades in {}s exceeds cap of {}",
                    ctx.trades_in_window, self.config.window_secs, self.config.max_trades
                ),
            },
        }]
    }
}
