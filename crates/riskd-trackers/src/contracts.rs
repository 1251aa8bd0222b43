//! TTL-cached contract metadata with coalesced remote fetch.
//!
//! Metadata (tick size/value) comes from an external metadata-source
//! collaborator. The cache serves fresh entries without touching the
//! source; a miss or expired entry triggers exactly one in-flight fetch
//! per contract, bounded by a timeout, with concurrent callers parked on
//! a per-contract async mutex and re-reading the cache once it resolves.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, warn};

use riskd_core::{ContractId, ContractMetadata};
use riskd_telemetry::metrics::CONTRACT_CACHE_TOTAL;

use crate::error::{TrackerError, TrackerResult};

/// Default fetch timeout: 2 seconds.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(2);

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// External source of contract metadata.
///
/// Trait-based so the daemon can inject the real upstream client and
/// tests can inject a scripted mock.
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for one contract.
    fn fetch<'a>(&'a self, contract_id: &'a ContractId)
        -> BoxFuture<'a, TrackerResult<ContractMetadata>>;
}

/// TTL cache over a `MetadataSource`.
pub struct ContractCache {
    entries: DashMap<ContractId, ContractMetadata>,
    /// Per-contract fetch guard; concurrent misses coalesce here.
    inflight: DashMap<ContractId, Arc<tokio::sync::Mutex<()>>>,
    source: Arc<dyn MetadataSource>,
    fetch_timeout: Duration,
}

impl ContractCache {
    pub fn new(source: Arc<dyn MetadataSource>, fetch_timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            source,
            fetch_timeout,
        }
    }

    /// Fresh metadata, fetching from the source on miss or expiry.
    ///
    /// Concurrent calls for the same contract produce a single source
    /// fetch; waiters observe the freshly cached entry.
    pub async fn get_metadata(
        &self,
        contract_id: &ContractId,
    ) -> TrackerResult<ContractMetadata> {
        if let Some(meta) = self.peek(contract_id) {
            CONTRACT_CACHE_TOTAL.with_label_values(&["hit"]).inc();
            return Ok(meta);
        }

        let guard = self
            .inflight
            .entry(contract_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _lock = guard.lock().await;

        // Another waiter may have completed the fetch while we queued.
        if let Some(meta) = self.peek(contract_id) {
            CONTRACT_CACHE_TOTAL.with_label_values(&["coalesced"]).inc();
            return Ok(meta);
        }

        CONTRACT_CACHE_TOTAL.with_label_values(&["miss"]).inc();
        debug!(contract = %contract_id, "fetching contract metadata");

        let outcome = tokio::time::timeout(self.fetch_timeout, self.source.fetch(contract_id)).await;
        // The guard entry is only needed while a fetch is in flight;
        // waiters already queued hold their own Arc to the mutex.
        self.inflight.remove(contract_id);

        let fetched = match outcome {
            Ok(Ok(meta)) => meta,
            Ok(Err(e)) => {
                CONTRACT_CACHE_TOTAL.with_label_values(&["error"]).inc();
                warn!(contract = %contract_id, error = %e, "metadata fetch failed");
                return Err(e);
            }
            Err(_) => {
                CONTRACT_CACHE_TOTAL.with_label_values(&["timeout"]).inc();
                warn!(contract = %contract_id, timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "metadata fetch timed out");
                return Err(TrackerError::FetchTimeout(contract_id.clone()));
            }
        };

        self.entries.insert(contract_id.clone(), fetched.clone());
        Ok(fetched)
    }

    /// Cached metadata only if still fresh; never fetches.
    pub fn peek(&self, contract_id: &ContractId) -> Option<ContractMetadata> {
        let now = Utc::now();
        let entry = self.entries.get(contract_id)?;
        if entry.is_fresh(now) {
            Some(entry.clone())
        } else {
            None
        }
    }
}

/// Scripted metadata source for tests.
pub struct MockMetadataSource {
    template: parking_lot::Mutex<ContractMetadata>,
    fetch_count: std::sync::atomic::AtomicU32,
    fail: std::sync::atomic::AtomicBool,
    delay: parking_lot::Mutex<Option<Duration>>,
}

impl MockMetadataSource {
    /// A mock serving copies of `template` (contract_id overwritten per call).
    pub fn new(template: ContractMetadata) -> Self {
        Self {
            template: parking_lot::Mutex::new(template),
            fetch_count: std::sync::atomic::AtomicU32::new(0),
            fail: std::sync::atomic::AtomicBool::new(false),
            delay: parking_lot::Mutex::new(None),
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }
}

impl MetadataSource for MockMetadataSource {
    fn fetch<'a>(
        &'a self,
        contract_id: &'a ContractId,
    ) -> BoxFuture<'a, TrackerResult<ContractMetadata>> {
        Box::pin(async move {
            self.fetch_count
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

            let delay = *self.delay.lock();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(TrackerError::FetchFailed {
                    contract_id: contract_id.clone(),
                    message: "mock failure".to_string(),
                });
            }

            let mut meta = self.template.lock().clone();
            meta.contract_id = contract_id.clone();
            meta.fetched_at = Utc::now();
            Ok(meta)
        })
    }
}
