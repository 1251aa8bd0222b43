//! Daily reset scheduler.
//!
//! Sleeps until the next calendar boundary, then fires the registered
//! reset callbacks per account in fixed registration order. A persisted
//! per-account watermark (last reset trading day) guarantees each
//! boundary fires exactly once, including across a restart that lands
//! after the boundary but before the process observed it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::{DashMap, DashSet};
use tracing::{error, info, warn};

use riskd_core::AccountId;
use riskd_persistence::StateStore;

use crate::calendar::TradingCalendar;
use crate::error::{ScheduleError, ScheduleResult};

/// Reset callback: account and the trading day being opened.
pub type ResetCallback = Arc<dyn Fn(&AccountId, NaiveDate) + Send + Sync>;

pub struct ResetScheduler {
    calendar: TradingCalendar,
    store: Arc<StateStore>,
    /// Last trading day each account has been reset onto.
    watermarks: DashMap<AccountId, NaiveDate>,
    accounts: DashSet<AccountId>,
    callbacks: Vec<(String, ResetCallback)>,
}

impl ResetScheduler {
    /// Load persisted watermarks and wire the calendar.
    pub fn new(calendar: TradingCalendar, store: Arc<StateStore>) -> ScheduleResult<Self> {
        let watermarks = DashMap::new();
        for (account, date) in store.load_watermarks()? {
            watermarks.insert(account, date);
        }
        Ok(Self {
            calendar,
            store,
            watermarks,
            accounts: DashSet::new(),
            callbacks: Vec::new(),
        })
    }

    /// Register a reset callback. Callbacks fire in registration order.
    pub fn register_callback(
        &mut self,
        name: impl Into<String>,
        callback: ResetCallback,
    ) -> &mut Self {
        self.callbacks.push((name.into(), callback));
        self
    }

    /// Track an account for boundary resets.
    ///
    /// An account first seen with no watermark starts at the current
    /// trading day: there is nothing accumulated to reset yet.
    pub fn register_account(&self, account_id: &AccountId, now: DateTime<Utc>) {
        if self.accounts.insert(account_id.clone()) {
            self.watermarks
                .entry(account_id.clone())
                .or_insert_with(|| self.current_trading_day(now));
            self.persist();
        }
    }

    /// Fire any boundary missed while the process was down.
    ///
    /// An account whose watermark is behind the current trading day and
    /// whose boundary has already passed is reset immediately, once.
    pub fn catch_up(&self, now: DateTime<Utc>) {
        let Some(last) = self.calendar.last_boundary(now) else {
            warn!("calendar yields no past boundary, skipping catch-up");
            return;
        };
        let day = self.calendar.trading_day_of(last);
        // Persisted watermarks cover accounts not yet re-registered
        // after a restart; sweep them too so stale daily counters never
        // leak into the new trading day.
        let mut pending: HashSet<AccountId> = self
            .watermarks
            .iter()
            .map(|e| e.key().clone())
            .collect();
        pending.extend(self.accounts.iter().map(|a| a.clone()));
        for account in &pending {
            self.fire_for(account, day);
        }
    }

    /// Sleep-and-fire loop. Runs until the task is aborted.
    pub async fn run(self: Arc<Self>) -> ScheduleResult<()> {
        loop {
            let now = Utc::now();
            let boundary = self
                .calendar
                .next_boundary(now)
                .ok_or(ScheduleError::NoBoundary)?;
            let wait = (boundary - now).to_std().unwrap_or_default();
            info!(boundary = %boundary, wait_secs = wait.as_secs(), "next reset boundary");
            tokio::time::sleep(wait).await;

            let day = self.calendar.trading_day_of(boundary);
            for account in self.accounts.iter() {
                self.fire_for(&account, day);
            }
        }
    }

    /// Run callbacks for one account, guarded by the watermark.
    fn fire_for(&self, account_id: &AccountId, trading_day: NaiveDate) {
        {
            let mut watermark =
                self.watermarks
                    .entry(account_id.clone())
                    .or_insert_with(|| {
                        // Unseen account: set the watermark so future
                        // boundaries fire, but skip this one.
                        trading_day
                    });
            if *watermark >= trading_day {
                return;
            }
            *watermark = trading_day;
        }

        info!(account = %account_id, day = %trading_day, "firing daily reset");
        for (name, callback) in &self.callbacks {
            info!(account = %account_id, callback = %name, "reset callback");
            callback(account_id, trading_day);
        }
        self.persist();
    }

    fn current_trading_day(&self, now: DateTime<Utc>) -> NaiveDate {
        self.calendar
            .last_boundary(now)
            .map(|b| self.calendar.trading_day_of(b))
            .unwrap_or_else(|| self.calendar.trading_day_of(now))
    }

    fn persist(&self) {
        let snapshot: HashMap<AccountId, NaiveDate> = self
            .watermarks
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        if let Err(e) = self.store.save_watermarks(&snapshot) {
            error!(?e, "failed to persist reset watermarks");
        }
    }
}
