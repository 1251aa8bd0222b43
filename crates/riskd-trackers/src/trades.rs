//! Sliding-window trade-frequency counter.
//!
//! Records trade timestamps per account and answers "how many trades in
//! the last N seconds". Entries older than the maximum window are
//! evicted lazily on each record.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use riskd_core::AccountId;

/// Default retention: one hour covers any sane frequency-rule window.
pub const DEFAULT_MAX_WINDOW_SECS: i64 = 3_600;

/// Per-account sliding-window trade counter.
pub struct TradeCounter {
    timestamps: DashMap<AccountId, VecDeque<DateTime<Utc>>>,
    max_window: Duration,
}

impl Default for TradeCounter {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_MAX_WINDOW_SECS))
    }
}

impl TradeCounter {
    #[must_use]
    pub fn new(max_window: Duration) -> Self {
        Self {
            timestamps: DashMap::new(),
            max_window,
        }
    }

    /// Record one trade at `at`, evicting entries past retention.
    pub fn record_trade(&self, account_id: &AccountId, at: DateTime<Utc>) {
        let mut entry = self.timestamps.entry(account_id.clone()).or_default();
        entry.push_back(at);

        let cutoff = at - self.max_window;
        while entry.front().is_some_and(|t| *t <= cutoff) {
            entry.pop_front();
        }
    }

    /// Trades with timestamp in `(now - window, now]`.
    pub fn count_in_window(
        &self,
        account_id: &AccountId,
        window: Duration,
        now: DateTime<Utc>,
    ) -> u64 {
        let Some(entry) = self.timestamps.get(account_id) else {
            return 0;
        };
        let cutoff = now - window;
        entry.iter().filter(|t| **t > cutoff && **t <= now).count() as u64
    }

    /// Clear the account's window (daily boundary reset).
    pub fn reset(&self, account_id: &AccountId) {
        self.timestamps.remove(account_id);
    }
}
