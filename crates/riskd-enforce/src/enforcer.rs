//! Decision execution: sink dispatch, retry, and lockout escalation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use riskd_core::{
    AccountId, EnforcementAction, EnforcementDecision, LockoutKind, Order, Position,
};
use riskd_lockout::LockoutManager;
use riskd_telemetry::metrics::ENFORCEMENTS_TOTAL;

use crate::error::{SinkError, SinkResult};
use crate::sink::{ActionSink, BoxFuture};

/// Bounded exponential backoff for transient sink failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            multiplier: 2,
        }
    }
}

/// Outcome of executing one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    /// Every mandated sink call succeeded.
    Completed,
    /// A mandated action could not be carried out; the account has been
    /// permanently locked out as a fail-safe.
    Escalated,
}

/// Maps enforcement decisions onto sink and lockout-manager calls.
///
/// An enforcement obligation is never silently dropped: a sink call
/// that keeps failing past the retry budget, or fails permanently,
/// escalates to a Permanent lockout.
pub struct Enforcer {
    sink: Arc<dyn ActionSink>,
    lockouts: Arc<LockoutManager>,
    retry: RetryPolicy,
    /// Per-attempt sink call timeout; an elapsed attempt counts as a
    /// transient failure.
    call_timeout: Duration,
}

impl Enforcer {
    pub fn new(sink: Arc<dyn ActionSink>, lockouts: Arc<LockoutManager>) -> Self {
        Self {
            sink,
            lockouts,
            retry: RetryPolicy::default(),
            call_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Execute one resolved decision against the provided snapshot of
    /// the account's open positions and working orders.
    pub async fn execute(
        &self,
        decision: &EnforcementDecision,
        positions: &[Position],
        open_orders: &[Order],
    ) -> ActionResult {
        let account_id = &decision.account_id;
        let kind = action_kind(&decision.action);

        let outcome = match &decision.action {
            EnforcementAction::ClosePosition { contract_id } => {
                self.with_retry_loop(account_id, kind, || {
                    self.sink.close_position(account_id, contract_id)
                })
                .await
            }
            EnforcementAction::CloseAllPositions => {
                let mut result = Ok(());
                for position in positions {
                    let contract_id = &position.contract_id;
                    if let Err(e) = self
                        .with_retry_loop(account_id, kind, || {
                            self.sink.close_position(account_id, contract_id)
                        })
                        .await
                    {
                        result = Err(e);
                    }
                }
                result
            }
            EnforcementAction::ReduceToLimit {
                contract_id,
                target_size,
            } => {
                self.with_retry_loop(account_id, kind, || {
                    self.sink
                        .reduce_to_limit(account_id, contract_id, *target_size)
                })
                .await
            }
            EnforcementAction::CancelOrders { contract_id } => {
                let mut result = Ok(());
                for order in open_orders
                    .iter()
                    .filter(|o| contract_id.as_ref().map_or(true, |c| *c == o.contract_id))
                {
                    let order_id = &order.order_id;
                    if let Err(e) = self
                        .with_retry_loop(account_id, kind, || {
                            self.sink.cancel_order(account_id, order_id)
                        })
                        .await
                    {
                        result = Err(e);
                    }
                }
                result
            }
            EnforcementAction::ApplyLockout {
                kind: lockout_kind,
                until,
                reason,
            } => {
                match self
                    .lockouts
                    .apply(account_id, *lockout_kind, reason.clone(), *until)
                {
                    Ok(_) => Ok(()),
                    Err(e) => Err(SinkError::Permanent(format!("lockout apply failed: {e}"))),
                }
            }
        };

        match outcome {
            Ok(()) => {
                ENFORCEMENTS_TOTAL.with_label_values(&[kind, "ok"]).inc();
                info!(account = %account_id, decision = %decision, "enforcement completed");
                ActionResult::Completed
            }
            Err(e) => {
                ENFORCEMENTS_TOTAL
                    .with_label_values(&[kind, "escalated"])
                    .inc();
                self.escalate(account_id, &decision.rule, &e);
                ActionResult::Escalated
            }
        }
    }

    /// Run one sink call under the retry policy.
    async fn with_retry_loop<'a, F>(
        &self,
        account_id: &AccountId,
        kind: &'static str,
        mut call: F,
    ) -> SinkResult
    where
        F: FnMut() -> BoxFuture<'a, SinkResult>,
    {
        let mut delay = self.retry.base_delay;
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(SinkError::Transient(format!(
                    "sink call timed out after {:?}",
                    self.call_timeout
                ))),
            };
            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    warn!(account = %account_id, action = kind, attempt,
                        delay_ms = delay.as_millis() as u64, error = %e,
                        "transient sink failure, backing off");
                    tokio::time::sleep(delay).await;
                    delay *= self.retry.multiplier;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fail-safe: an unenforceable account is locked out, not left open.
    fn escalate(&self, account_id: &AccountId, rule: &str, cause: &SinkError) {
        error!(account = %account_id, rule, error = %cause,
            "enforcement failed, escalating to permanent lockout");
        if let Err(e) = self.lockouts.apply(
            account_id,
            LockoutKind::Permanent,
            format!("enforcement failure ({rule}): {cause}"),
            None,
        ) {
            error!(account = %account_id, ?e, "escalation lockout failed");
        }
    }
}

fn action_kind(action: &EnforcementAction) -> &'static str {
    match action {
        EnforcementAction::ClosePosition { .. } => "close_position",
        EnforcementAction::CloseAllPositions => "close_all_positions",
        EnforcementAction::ReduceToLimit { .. } => "reduce_to_limit",
        EnforcementAction::CancelOrders { .. } => "cancel_orders",
        EnforcementAction::ApplyLockout { .. } => "apply_lockout",
    }
}
