//! Rule trait, engine, and decision conflict resolution.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use riskd_core::{EnforcementAction, EnforcementDecision, LockoutKind};
use riskd_telemetry::metrics::RULE_BREACHES_TOTAL;

use crate::config::RulesConfig;
use crate::context::RuleContext;
use crate::rules::{DailyLossRule, MaxContractsRule, MaxOpenOrdersRule, TradeFrequencyRule};

/// A risk policy. Evaluation is a pure function of the context: no I/O,
/// no shared state, independently testable.
pub trait RiskRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decisions mandated by this rule, empty when the account is
    /// within limits. A breach may mandate more than one action
    /// (flatten plus lockout).
    fn evaluate(&self, ctx: &RuleContext) -> Vec<EnforcementDecision>;
}

/// Runs the policy set in fixed order and resolves conflicts.
pub struct RuleEngine {
    rules: Vec<Box<dyn RiskRule>>,
}

impl RuleEngine {
    /// Build the policy set from validated configuration.
    ///
    /// Rule order is fixed: max_contracts, daily_loss, trade_frequency,
    /// max_open_orders. Disabled rules still run and return nothing, so
    /// the order never varies with configuration.
    pub fn from_config(config: &RulesConfig) -> Self {
        Self {
            rules: vec![
                Box::new(MaxContractsRule::new(config.max_contracts.clone())),
                Box::new(DailyLossRule::new(config.daily_loss.clone())),
                Box::new(TradeFrequencyRule::new(config.trade_frequency.clone())),
                Box::new(MaxOpenOrdersRule::new(config.max_open_orders.clone())),
            ],
        }
    }

    #[cfg(test)]
    pub fn with_rules(rules: Vec<Box<dyn RiskRule>>) -> Self {
        Self { rules }
    }

    /// Evaluate every rule and resolve the combined decision set.
    pub fn evaluate(&self, ctx: &RuleContext) -> Vec<EnforcementDecision> {
        let mut decisions = Vec::new();
        for rule in &self.rules {
            let verdicts = rule.evaluate(ctx);
            if !verdicts.is_empty() {
                RULE_BREACHES_TOTAL.with_label_values(&[rule.name()]).inc();
                warn!(account = %ctx.account_id, rule = rule.name(),
                    decisions = verdicts.len(), "rule breach");
            }
            decisions.extend(verdicts);
        }
        resolve_decisions(decisions)
    }
}

/// Resolve simultaneous multi-rule breaches into a conflict-free set.
///
/// Position actions deduplicate to the most severe per contract, and a
/// CloseAllPositions supersedes every per-contract position action.
/// Cancel actions keep one global cancel or one per contract. Lockouts
/// merge to the single most severe: Permanent beats Temporary, longer
/// Temporary beats shorter.
pub fn resolve_decisions(decisions: Vec<EnforcementDecision>) -> Vec<EnforcementDecision> {
    let mut close_all: Option<EnforcementDecision> = None;
    let mut per_contract = BTreeMap::new();
    let mut cancel_all: Option<EnforcementDecision> = None;
    let mut cancels = BTreeMap::new();
    let mut lockouts = Vec::new();

    for decision in decisions {
        match &decision.action {
            EnforcementAction::CloseAllPositions => {
                close_all.get_or_insert(decision);
            }
            EnforcementAction::ClosePosition { contract_id }
            | EnforcementAction::ReduceToLimit { contract_id, .. } => {
                let entry = per_contract
                    .entry(contract_id.clone())
                    .or_insert_with(|| decision.clone());
                if decision.action.severity() > entry.action.severity() {
                    *entry = decision;
                }
            }
            EnforcementAction::CancelOrders { contract_id: None } => {
                cancel_all.get_or_insert(decision);
            }
            EnforcementAction::CancelOrders {
                contract_id: Some(contract_id),
            } => {
                cancels.entry(contract_id.clone()).or_insert(decision);
            }
            EnforcementAction::ApplyLockout { .. } => lockouts.push(decision),
        }
    }

    let mut resolved = Vec::new();
    if let Some(decision) = close_all {
        debug!(account = %decision.account_id, "close-all supersedes per-contract actions");
        resolved.push(decision);
    } else {
        resolved.extend(per_contract.into_values());
    }
    if let Some(decision) = cancel_all {
        resolved.push(decision);
    } else {
        resolved.extend(cancels.into_values());
    }
    if let Some(decision) = merge_lockouts(lockouts) {
        resolved.push(decision);
    }
    resolved
}

fn merge_lockouts(lockouts: Vec<EnforcementDecision>) -> Option<EnforcementDecision> {
    lockouts.into_iter().reduce(|winner, challenger| {
        let (EnforcementAction::ApplyLockout {
            kind: wk,
            until: wu,
            ..
        }, EnforcementAction::ApplyLockout {
            kind: ck,
            until: cu,
            ..
        }) = (&winner.action, &challenger.action)
        else {
            return winner;
        };
        match (wk, ck) {
            (LockoutKind::Permanent, _) => winner,
            (_, LockoutKind::Permanent) => challenger,
            // Both Temporary: longer expiry wins.
            _ if cu > wu => challenger,
            _ => winner,
        }
    })
}
