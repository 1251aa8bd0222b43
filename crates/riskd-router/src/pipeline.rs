//! The per-event enforcement pipeline.
//!
//! Every account-scoped event moves through the same fixed stages:
//! state update, contract-metadata warm-up, lockout gate, rule
//! evaluation over an owned snapshot, action dispatch. A stage failure is logged with account context and
//! the stream moves on; a stale event is dropped, never retried.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, warn};

use riskd_core::{AccountId, RiskEvent};
use riskd_enforce::Enforcer;
use riskd_lockout::LockoutManager;
use riskd_pnl::PnlTracker;
use riskd_rules::{RuleContext, RuleEngine};
use riskd_schedule::TradingCalendar;
use riskd_state::{StateError, StateManager};
use riskd_telemetry::metrics::{EVENTS_TOTAL, EVENT_LATENCY_SECONDS, SEQUENCE_DROPS_TOTAL};
use riskd_trackers::{ContractCache, QuoteTracker, TradeCounter};

/// How one event left the pipeline, for the events metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Full pipeline ran.
    Processed,
    /// Stale sequence; state untouched.
    Dropped,
    /// State updated, rule evaluation suppressed by an active lockout.
    Suppressed,
}

impl EventOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Dropped => "dropped",
            Self::Suppressed => "suppressed",
        }
    }
}

/// Shared components the pipeline drives.
pub struct Pipeline {
    pub state: Arc<StateManager>,
    pub quotes: Arc<QuoteTracker>,
    pub trades: Arc<TradeCounter>,
    pub contracts: Arc<ContractCache>,
    pub pnl: Arc<PnlTracker>,
    pub lockouts: Arc<LockoutManager>,
    pub engine: Arc<RuleEngine>,
    pub enforcer: Arc<Enforcer>,
    pub calendar: TradingCalendar,
    /// Window the trade-frequency rule counts over.
    pub trade_window: Duration,
}

impl Pipeline {
    /// Run one account-scoped event through the pipeline.
    pub async fn process(&self, event: &RiskEvent) {
        let timer = EVENT_LATENCY_SECONDS.start_timer();
        let outcome = self.run_stages(event).await;
        timer.observe_duration();
        EVENTS_TOTAL
            .with_label_values(&[event.kind(), outcome.label()])
            .inc();
    }

    async fn run_stages(&self, event: &RiskEvent) -> EventOutcome {
        // Stage: state update. State always changes before rules run,
        // even for a locked-out account.
        let account_id = match self.update_state(event) {
            Ok(Some(account_id)) => account_id,
            Ok(None) => return EventOutcome::Processed,
            Err(StateError::StaleSequence {
                account_id,
                sequence,
                last,
            }) => {
                SEQUENCE_DROPS_TOTAL.inc();
                debug!(account = %account_id, sequence, last, "stale event dropped");
                return EventOutcome::Dropped;
            }
        };

        // Stage: metadata warm-up. Unrealized PnL reads the cache
        // without fetching; resolve the contract this event touches so
        // mark-outs over it are observable. A failed fetch is contained
        // and the position stays excluded-and-flagged.
        let contract_id = event.contract_id();
        if let Err(e) = self.contracts.get_metadata(contract_id).await {
            warn!(account = %account_id, contract = %contract_id, error = %e,
                "contract metadata unavailable, unrealized PnL will exclude it");
        }

        // Stage: lockout gate. Enforcement already happened when the
        // lockout was applied; new rule work is suppressed until it
        // clears.
        if self.lockouts.is_locked_out(&account_id) {
            debug!(account = %account_id, kind = event.kind(),
                "account locked out, skipping rule evaluation");
            return EventOutcome::Suppressed;
        }

        // Stage: rule evaluation over an owned snapshot; no state locks
        // are held while rules run.
        let ctx = self.snapshot(&account_id);
        let decisions = self.engine.evaluate(&ctx);

        // Stage: action dispatch. Escalation is handled inside the
        // enforcer; the router only reports.
        for decision in &decisions {
            let result = self
                .enforcer
                .execute(decision, &ctx.positions, &ctx.open_orders)
                .await;
            debug!(account = %account_id, decision = %decision, ?result, "action dispatched");
        }

        EventOutcome::Processed
    }

    /// Apply the event to the per-account state and trackers.
    ///
    /// Returns the account the event belongs to, or None for
    /// market-scoped events.
    fn update_state(&self, event: &RiskEvent) -> Result<Option<AccountId>, StateError> {
        match event {
            RiskEvent::PositionUpdate(e) => {
                self.state.apply_position_event(e)?;
                Ok(Some(e.account_id.clone()))
            }
            RiskEvent::OrderUpdate(e) => {
                self.state.apply_order_event(e)?;
                Ok(Some(e.order.account_id.clone()))
            }
            RiskEvent::TradeExecuted(e) => {
                self.state.apply_trade_event(e)?;
                let trade = &e.trade;
                self.pnl.record_realized(
                    &trade.account_id,
                    &trade.contract_id,
                    trade.realized_pnl,
                    trade.fees,
                    trade.executed_at,
                );
                self.trades.record_trade(&trade.account_id, trade.executed_at);
                Ok(Some(trade.account_id.clone()))
            }
            RiskEvent::QuoteUpdate(quote) => {
                // Market-scoped: refresh the tracker, no rule work.
                self.quotes.update_quote(quote.clone());
                Ok(None)
            }
        }
    }

    /// Owned per-account snapshot for rule evaluation.
    fn snapshot(&self, account_id: &AccountId) -> RuleContext {
        let now = Utc::now();
        let next_reset = self.calendar.next_boundary(now);
        if next_reset.is_none() {
            warn!(account = %account_id, "calendar yields no next boundary");
        }
        RuleContext {
            account_id: account_id.clone(),
            positions: self.state.positions(account_id),
            open_orders: self.state.open_orders(account_id),
            daily: self.pnl.daily(account_id),
            unrealized: self.pnl.unrealized(account_id),
            trades_in_window: self
                .trades
                .count_in_window(account_id, self.trade_window, now),
            lockout: self.lockouts.status(account_id),
            now,
            next_reset,
        }
    }
}
