//! Named-timer scheduler for delayed, cancellable callbacks.
//!
//! Timers are keyed by (account, name) with last-writer-wins semantics:
//! starting a timer replaces and aborts any pending same-named one.
//! Callbacks run on a spawned task exactly once, off the router's event
//! path; they must re-validate current conditions before acting, since
//! state may have changed between scheduling and firing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use riskd_core::AccountId;

/// Callback invoked when a timer fires.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

type TimerKey = (AccountId, String);

struct ScheduledTimer {
    generation: u64,
    fires_at: DateTime<Utc>,
    /// None until the sleeping task is spawned; a zero-duration timer
    /// may fire and remove the entry before the handle is attached.
    handle: Option<JoinHandle<()>>,
}

/// Scheduler for named per-account timers (cooldowns, grace periods,
/// proactive lockout expiry).
pub struct TimerManager {
    timers: Arc<DashMap<TimerKey, ScheduledTimer>>,
    generation: AtomicU64,
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timers: Arc::new(DashMap::new()),
            generation: AtomicU64::new(1),
        }
    }

    /// Schedule `callback` to run once after `duration`.
    ///
    /// Replaces any pending timer with the same (account, name),
    /// cancelling its callback.
    pub fn start_timer(
        &self,
        name: &str,
        account_id: &AccountId,
        duration: Duration,
        callback: TimerCallback,
    ) {
        let key: TimerKey = (account_id.clone(), name.to_string());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let fires_at = Utc::now() + chrono::Duration::from_std(duration).unwrap_or_default();

        // The entry must be in the map before the task spawns: a
        // zero-duration timer can wake immediately, and it only fires
        // when it finds (and removes) its own generation.
        if let Some(prior) = self.timers.insert(
            key.clone(),
            ScheduledTimer {
                generation,
                fires_at,
                handle: None,
            },
        ) {
            debug!(account = %key.0, timer = %key.1, "replacing pending timer");
            if let Some(handle) = prior.handle {
                handle.abort();
            }
        }

        let timers = Arc::clone(&self.timers);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Only the current generation may fire; a replacement that
            // raced our wakeup wins.
            let owned = timers
                .remove_if(&task_key, |_, t| t.generation == generation)
                .is_some();
            if owned {
                trace!(account = %task_key.0, timer = %task_key.1, "timer fired");
                callback();
            }
        });

        // Attach the handle unless the timer already fired or was
        // replaced; a superseded task fails its generation check and
        // simply idles out.
        if let Some(mut entry) = self.timers.get_mut(&key) {
            if entry.generation == generation {
                entry.handle = Some(handle);
            }
        }
    }

    /// Cancel a pending timer; its callback will not run.
    pub fn cancel(&self, name: &str, account_id: &AccountId) -> bool {
        let key: TimerKey = (account_id.clone(), name.to_string());
        match self.timers.remove(&key) {
            Some((_, timer)) => {
                if let Some(handle) = timer.handle {
                    handle.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Time until the named timer fires, if pending.
    pub fn remaining(&self, name: &str, account_id: &AccountId) -> Option<Duration> {
        let key: TimerKey = (account_id.clone(), name.to_string());
        let timer = self.timers.get(&key)?;
        (timer.fires_at - Utc::now()).to_std().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn counter_callback(counter: Arc<AtomicU32>) -> TimerCallback {
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_exactly_once() {
        let timers = TimerManager::new();
        let fired = Arc::new(AtomicU32::new(0));
        timers.start_timer(
            "cooldown",
            &AccountId::from("acct-1"),
            Duration::from_secs(5),
            counter_callback(fired.clone()),
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(timers.remaining("cooldown", &AccountId::from("acct-1")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_pending_timer() {
        let timers = TimerManager::new();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let account = AccountId::from("acct-1");

        timers.start_timer(
            "cooldown",
            &account,
            Duration::from_secs(5),
            counter_callback(first.clone()),
        );
        timers.start_timer(
            "cooldown",
            &account,
            Duration::from_secs(10),
            counter_callback(second.clone()),
        );

        tokio::time::sleep(Duration::from_secs(12)).await;
        settle().await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let timers = TimerManager::new();
        let fired = Arc::new(AtomicU32::new(0));
        let account = AccountId::from("acct-1");

        timers.start_timer(
            "grace",
            &account,
            Duration::from_secs(5),
            counter_callback(fired.clone()),
        );
        assert!(timers.cancel("grace", &account));

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn zero_duration_timers_never_lose_callbacks() {
        let timers = TimerManager::new();
        let fired = Arc::new(AtomicU32::new(0));
        let count = 500u32;

        // An expired lockout schedules a zero-duration expiry timer;
        // the callback must run even when the task wakes before the
        // scheduling thread finishes bookkeeping.
        for i in 0..count {
            let account = AccountId::from(format!("acct-{i}").as_str());
            timers.start_timer("expiry", &account, Duration::ZERO, counter_callback(fired.clone()));
        }

        for _ in 0..200 {
            if fired.load(Ordering::SeqCst) == count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), count);
        // No stale entries left reporting a pending deadline.
        assert!(timers
            .remaining("expiry", &AccountId::from("acct-0"))
            .is_none());
    }

    #[tokio::test]
    async fn remaining_reports_pending_deadline() {
        let timers = TimerManager::new();
        let account = AccountId::from("acct-1");
        timers.start_timer(
            "grace",
            &account,
            Duration::from_secs(60),
            Arc::new(|| {}),
        );

        let remaining = timers.remaining("grace", &account).unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(55));
        assert!(timers.remaining("other", &account).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timers_are_scoped_per_account() {
        let timers = TimerManager::new();
        let a = Arc::new(AtomicU32::new(0));
        let b = Arc::new(AtomicU32::new(0));

        timers.start_timer(
            "cooldown",
            &AccountId::from("a"),
            Duration::from_secs(5),
            counter_callback(a.clone()),
        );
        timers.start_timer(
            "cooldown",
            &AccountId::from("b"),
            Duration::from_secs(5),
            counter_callback(b.clone()),
        );

        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }
}
