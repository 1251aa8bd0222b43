//! Durable per-account lockout state machine.
//!
//! None -> Temporary (breach with cooldown) -> None on expiry, checked
//! lazily on every query and proactively via a named timer.
//! None/Temporary -> Permanent on critical breach; Permanent requires an
//! explicit administrative release and is never cleared by an expiry
//! sweep. Records persist across restarts through the state store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};

use riskd_core::{AccountId, LockoutKind, LockoutRecord};
use riskd_persistence::StateStore;
use riskd_telemetry::metrics::LOCKOUTS_TOTAL;

use crate::error::{LockoutError, LockoutResult};
use crate::timer::TimerManager;

/// Timer name used for proactive Temporary-lockout expiry.
pub const LOCKOUT_EXPIRY_TIMER: &str = "lockout-expiry";

/// Per-account trading-restriction state machine.
pub struct LockoutManager {
    records: Arc<DashMap<AccountId, LockoutRecord>>,
    store: Arc<StateStore>,
    timers: Option<Arc<TimerManager>>,
}

impl LockoutManager {
    /// Load persisted records; expired Temporary records are pruned.
    pub fn new(store: Arc<StateStore>) -> LockoutResult<Self> {
        let now = Utc::now();
        let mut loaded = store.load_lockouts()?;
        let before = loaded.len();
        loaded.retain(|_, record| !record.is_expired(now));
        if loaded.len() != before {
            info!(pruned = before - loaded.len(), "pruned expired lockouts at startup");
        }

        let records = Arc::new(DashMap::new());
        for (account, record) in loaded {
            records.insert(account, record);
        }

        let manager = Self {
            records,
            store,
            timers: None,
        };
        manager.persist();
        Ok(manager)
    }

    /// Attach a timer manager for proactive expiry of Temporary lockouts.
    #[must_use]
    pub fn with_timers(mut self, timers: Arc<TimerManager>) -> Self {
        self.timers = Some(timers);
        self
    }

    /// Apply a lockout.
    ///
    /// - An existing Permanent lock always wins; re-applying returns it.
    /// - Applying an identical Temporary over an active one is a no-op:
    ///   the original expiry is NOT extended.
    /// - Permanent upgrades any Temporary.
    pub fn apply(
        &self,
        account_id: &AccountId,
        kind: LockoutKind,
        reason: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> LockoutResult<LockoutRecord> {
        let now = Utc::now();
        if kind == LockoutKind::Temporary && !expires_at.is_some_and(|t| t > now) {
            return Err(LockoutError::InvalidExpiry);
        }
        let expires_at = match kind {
            LockoutKind::Temporary => expires_at,
            LockoutKind::Permanent => None,
        };

        let reason = reason.into();
        let new_record = LockoutRecord {
            account_id: account_id.clone(),
            kind,
            reason: reason.clone(),
            applied_at: now,
            expires_at,
        };
        let mut applied = true;

        let record = match self.records.entry(account_id.clone()) {
            Entry::Vacant(vacant) => vacant.insert(new_record).clone(),
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get().clone();
                match (existing.kind, kind) {
                    (LockoutKind::Permanent, _) => {
                        warn!(account = %account_id, new_reason = %reason,
                            "account already permanently locked, keeping original");
                        applied = false;
                        existing
                    }
                    (LockoutKind::Temporary, LockoutKind::Temporary) => {
                        if existing.is_expired(now) {
                            occupied.insert(new_record.clone());
                            new_record
                        } else {
                            // Idempotent re-apply: expiry is not extended.
                            applied = false;
                            existing
                        }
                    }
                    (LockoutKind::Temporary, LockoutKind::Permanent) => {
                        occupied.insert(new_record.clone());
                        new_record
                    }
                }
            }
        };

        if applied {
            LOCKOUTS_TOTAL
                .with_label_values(&[&kind.to_string()])
                .inc();
            info!(account = %account_id, kind = %kind, reason = %record.reason,
                expires_at = ?record.expires_at, "lockout applied");
            self.persist();
            if record.kind == LockoutKind::Temporary {
                self.schedule_expiry(&record);
            }
        }

        Ok(record)
    }

    /// Explicit administrative release; the only path out of Permanent.
    pub fn release(&self, account_id: &AccountId) -> Option<LockoutRecord> {
        let removed = self.records.remove(account_id).map(|(_, r)| r);
        if let Some(ref record) = removed {
            info!(account = %account_id, kind = %record.kind, "lockout released");
            if let Some(timers) = &self.timers {
                timers.cancel(LOCKOUT_EXPIRY_TIMER, account_id);
            }
            self.persist();
        }
        removed
    }

    /// Whether the account is currently restricted.
    ///
    /// Self-heals: an expired Temporary record is removed here without
    /// any external trigger. Permanent records never self-heal.
    pub fn is_locked_out(&self, account_id: &AccountId) -> bool {
        self.status(account_id).is_some()
    }

    /// Current lockout record after lazy expiry.
    pub fn status(&self, account_id: &AccountId) -> Option<LockoutRecord> {
        let now = Utc::now();
        let expired = self
            .records
            // re-checked under the entry lock so a concurrent Permanent
            // upgrade is never cleared
            .remove_if(account_id, |_, record| record.is_expired(now))
            .is_some();
        if expired {
            info!(account = %account_id, "temporary lockout expired");
            self.persist();
            return None;
        }
        self.records.get(account_id).map(|r| r.clone())
    }

    /// Sweep every account's record; used by the daily lockout review.
    pub fn review(&self) {
        let accounts: Vec<AccountId> =
            self.records.iter().map(|e| e.key().clone()).collect();
        for account in accounts {
            let _ = self.status(&account);
        }
    }

    fn schedule_expiry(&self, record: &LockoutRecord) {
        let (Some(timers), Some(expires_at)) = (&self.timers, record.expires_at) else {
            return;
        };
        let delay = (expires_at - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        let records = Arc::clone(&self.records);
        let store = Arc::clone(&self.store);
        let account = record.account_id.clone();
        timers.start_timer(
            LOCKOUT_EXPIRY_TIMER,
            &record.account_id,
            delay,
            Arc::new(move || {
                // Re-validate: the record may have been upgraded to
                // Permanent or replaced since scheduling.
                let now = Utc::now();
                if records.remove_if(&account, |_, r| r.is_expired(now)).is_some() {
                    info!(account = %account, "temporary lockout expired (timer)");
                    let snapshot: HashMap<AccountId, LockoutRecord> = records
                        .iter()
                        .map(|e| (e.key().clone(), e.value().clone()))
                        .collect();
                    if let Err(e) = store.save_lockouts(&snapshot) {
                        warn!(?e, "failed to persist lockouts after expiry");
                    }
                }
            }),
        );
    }

    fn persist(&self) {
        let snapshot: HashMap<AccountId, LockoutRecord> = self
            .records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        if let Err(e) = self.store.save_lockouts(&snapshot) {
            warn!(?e, "failed to persist lockouts");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn manager() -> (tempfile::TempDir, LockoutManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()).unwrap());
        (dir, LockoutManager::new(store).unwrap())
    }

    #[test]
    fn temporary_requires_future_expiry() {
        let (_dir, lockouts) = manager();
        let err = lockouts.apply(
            &AccountId::from("acct-1"),
            LockoutKind::Temporary,
            "cooldown",
            None,
        );
        assert!(matches!(err, Err(LockoutError::InvalidExpiry)));

        let err = lockouts.apply(
            &AccountId::from("acct-1"),
            LockoutKind::Temporary,
            "cooldown",
            Some(Utc::now() - Duration::seconds(1)),
        );
        assert!(matches!(err, Err(LockoutError::InvalidExpiry)));
    }

    #[test]
    fn identical_temporary_does_not_extend_expiry() {
        let (_dir, lockouts) = manager();
        let account = AccountId::from("acct-1");
        let first_expiry = Utc::now() + Duration::seconds(30);

        let first = lockouts
            .apply(&account, LockoutKind::Temporary, "cooldown", Some(first_expiry))
            .unwrap();
        let second = lockouts
            .apply(
                &account,
                LockoutKind::Temporary,
                "cooldown",
                Some(Utc::now() + Duration::seconds(300)),
            )
            .unwrap();

        assert_eq!(second.expires_at, first.expires_at);
        assert!(lockouts.is_locked_out(&account));
    }

    #[test]
    fn expired_temporary_self_heals_on_query() {
        let (_dir, lockouts) = manager();
        let account = AccountId::from("acct-1");

        lockouts
            .apply(
                &account,
                LockoutKind::Temporary,
                "cooldown",
                Some(Utc::now() + Duration::milliseconds(5)),
            )
            .unwrap();
        assert!(lockouts.is_locked_out(&account));

        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(!lockouts.is_locked_out(&account));
        assert!(lockouts.status(&account).is_none());
    }

    #[test]
    fn permanent_wins_and_never_expires() {
        let (_dir, lockouts) = manager();
        let account = AccountId::from("acct-1");

        lockouts
            .apply(&account, LockoutKind::Permanent, "enforcement failed", None)
            .unwrap();
        // A later Temporary must not downgrade it.
        let record = lockouts
            .apply(
                &account,
                LockoutKind::Temporary,
                "cooldown",
                Some(Utc::now() + Duration::seconds(5)),
            )
            .unwrap();
        assert_eq!(record.kind, LockoutKind::Permanent);

        lockouts.review();
        assert!(lockouts.is_locked_out(&account));

        lockouts.release(&account);
        assert!(!lockouts.is_locked_out(&account));
    }

    #[test]
    fn temporary_upgrades_to_permanent() {
        let (_dir, lockouts) = manager();
        let account = AccountId::from("acct-1");

        lockouts
            .apply(
                &account,
                LockoutKind::Temporary,
                "cooldown",
                Some(Utc::now() + Duration::seconds(60)),
            )
            .unwrap();
        let record = lockouts
            .apply(&account, LockoutKind::Permanent, "critical breach", None)
            .unwrap();

        assert_eq!(record.kind, LockoutKind::Permanent);
        assert!(record.expires_at.is_none());
    }

    #[test]
    fn lockouts_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let account = AccountId::from("acct-1");
        {
            let store = Arc::new(StateStore::open(dir.path()).unwrap());
            let lockouts = LockoutManager::new(store).unwrap();
            lockouts
                .apply(&account, LockoutKind::Permanent, "breach", None)
                .unwrap();
        }

        let store = Arc::new(StateStore::open(dir.path()).unwrap());
        let reloaded = LockoutManager::new(store).unwrap();
        assert!(reloaded.is_locked_out(&account));
        assert_eq!(reloaded.status(&account).unwrap().kind, LockoutKind::Permanent);
    }

    #[tokio::test]
    async fn timer_proactively_expires_temporary() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()).unwrap());
        let timers = Arc::new(TimerManager::new());
        let lockouts = LockoutManager::new(store.clone()).unwrap().with_timers(timers);
        let account = AccountId::from("acct-1");

        lockouts
            .apply(
                &account,
                LockoutKind::Temporary,
                "cooldown",
                Some(Utc::now() + Duration::milliseconds(50)),
            )
            .unwrap();
        assert_eq!(store.load_lockouts().unwrap().len(), 1);

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;

        // The timer callback removed and persisted the record without any
        // query-driven lazy healing.
        assert!(store.load_lockouts().unwrap().is_empty());
        assert!(!lockouts.is_locked_out(&account));
    }
}
