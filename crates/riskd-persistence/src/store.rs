//! JSON snapshot store for durable enforcement state.
//!
//! Lockout records, daily counters, and reset watermarks must survive a
//! process restart. Each concern lives in its own JSON file; writes go to
//! a `.tmp` sibling first, then rename into place, so a crash mid-write
//! never leaves a truncated snapshot behind.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use riskd_core::{AccountId, DailyCounters, LockoutRecord};

use crate::error::PersistenceResult;

const LOCKOUTS_FILE: &str = "lockouts.json";
const COUNTERS_FILE: &str = "daily_counters.json";
const WATERMARKS_FILE: &str = "reset_watermarks.json";

/// File-backed store for enforcement state that must survive restart.
pub struct StateStore {
    base_dir: PathBuf,
    /// Serializes writers; snapshots are whole-file replacements.
    write_lock: Mutex<()>,
}

impl StateStore {
    /// Open (creating the directory if needed) a store rooted at `base_dir`.
    pub fn open(base_dir: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        info!(dir = %base_dir.display(), "Opened state store");
        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn load_lockouts(&self) -> PersistenceResult<HashMap<AccountId, LockoutRecord>> {
        self.load_file(LOCKOUTS_FILE)
    }

    pub fn save_lockouts(
        &self,
        lockouts: &HashMap<AccountId, LockoutRecord>,
    ) -> PersistenceResult<()> {
        self.save_file(LOCKOUTS_FILE, lockouts)
    }

    pub fn load_daily_counters(&self) -> PersistenceResult<HashMap<AccountId, DailyCounters>> {
        self.load_file(COUNTERS_FILE)
    }

    pub fn save_daily_counters(
        &self,
        counters: &HashMap<AccountId, DailyCounters>,
    ) -> PersistenceResult<()> {
        self.save_file(COUNTERS_FILE, counters)
    }

    /// Last trading day the reset scheduler fired for, per account.
    pub fn load_watermarks(&self) -> PersistenceResult<HashMap<AccountId, NaiveDate>> {
        self.load_file(WATERMARKS_FILE)
    }

    pub fn save_watermarks(
        &self,
        watermarks: &HashMap<AccountId, NaiveDate>,
    ) -> PersistenceResult<()> {
        self.save_file(WATERMARKS_FILE, watermarks)
    }

    fn load_file<T>(&self, name: &str) -> PersistenceResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.base_dir.join(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(value) => Ok(value),
            Err(e) => {
                // A corrupt snapshot should not take the daemon down; start
                // empty and let enforcement rebuild it.
                warn!(file = %path.display(), ?e, "Failed to parse snapshot, starting empty");
                Ok(T::default())
            }
        }
    }

    fn save_file<T: Serialize>(&self, name: &str, value: &T) -> PersistenceResult<()> {
        let _guard = self.write_lock.lock();
        let path = self.base_dir.join(name);
        let tmp = self.base_dir.join(format!("{name}.tmp"));

        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("base_dir", &self.base_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use riskd_core::{LockoutKind, Money};
    use rust_decimal_macros::dec;

    fn store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn missing_files_load_empty() {
        let (_dir, store) = store();
        assert!(store.load_lockouts().unwrap().is_empty());
        assert!(store.load_daily_counters().unwrap().is_empty());
        assert!(store.load_watermarks().unwrap().is_empty());
    }

    #[test]
    fn lockouts_round_trip() {
        let (_dir, store) = store();
        let account = AccountId::from("acct-1");
        let mut lockouts = HashMap::new();
        lockouts.insert(
            account.clone(),
            LockoutRecord {
                account_id: account.clone(),
                kind: LockoutKind::Permanent,
                reason: "enforcement failed".to_string(),
                applied_at: Utc::now(),
                expires_at: None,
            },
        );

        store.save_lockouts(&lockouts).unwrap();
        let loaded = store.load_lockouts().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[&account].kind, LockoutKind::Permanent);
    }

    #[test]
    fn counters_and_watermarks_round_trip() {
        let (_dir, store) = store();
        let account = AccountId::from("acct-1");
        let date = NaiveDate::from_ymd_opt(2026, 8, 27).unwrap();

        let mut counters = HashMap::new();
        let mut c = DailyCounters::new(account.clone(), date);
        c.realized_pnl = Money::new(dec!(-600));
        c.trade_count = 3;
        c.loss_count = 3;
        counters.insert(account.clone(), c);
        store.save_daily_counters(&counters).unwrap();

        let mut watermarks = HashMap::new();
        watermarks.insert(account.clone(), date);
        store.save_watermarks(&watermarks).unwrap();

        let loaded = store.load_daily_counters().unwrap();
        assert_eq!(loaded[&account].realized_pnl, Money::new(dec!(-600)));
        assert_eq!(store.load_watermarks().unwrap()[&account], date);
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let (dir, store) = store();
        std::fs::write(dir.path().join(LOCKOUTS_FILE), "{not json").unwrap();
        assert!(store.load_lockouts().unwrap().is_empty());
    }
}
