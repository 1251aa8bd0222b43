//! Event intake and the account-sharded worker pool.
//!
//! A single bounded queue feeds a dispatcher; account-scoped events
//! hash to a fixed worker so one account's events stay FIFO while
//! different accounts process in parallel. Quote updates have no
//! account scope and are applied inline by the dispatcher.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use riskd_core::RiskEvent;

use crate::error::{RouterError, RouterResult};
use crate::pipeline::Pipeline;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1_024,
        }
    }
}

/// Handle to the running router.
///
/// Dropping the handle without `shutdown` aborts nothing; call
/// `shutdown` to drain queued events before exit.
pub struct EventRouter {
    tx: mpsc::Sender<RiskEvent>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl EventRouter {
    /// Spawn the dispatcher and worker pool.
    pub fn start(config: RouterConfig, pipeline: Arc<Pipeline>) -> Self {
        let workers = config.workers.max(1);
        let (tx, mut rx) = mpsc::channel::<RiskEvent>(config.queue_capacity);

        let mut worker_txs = Vec::with_capacity(workers);
        let mut worker_handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let (wtx, mut wrx) = mpsc::channel::<RiskEvent>(config.queue_capacity);
            let pipeline = pipeline.clone();
            worker_txs.push(wtx);
            worker_handles.push(tokio::spawn(async move {
                while let Some(event) = wrx.recv().await {
                    pipeline.process(&event).await;
                }
                debug!(worker, "router worker stopped");
            }));
        }

        let dispatcher = tokio::spawn({
            let pipeline = pipeline.clone();
            async move {
                while let Some(event) = rx.recv().await {
                    match event.account_id() {
                        Some(account_id) => {
                            let slot = worker_index(account_id.as_str(), worker_txs.len());
                            // A closed worker channel means shutdown is
                            // already in progress.
                            let _ = worker_txs[slot].send(event).await;
                        }
                        None => pipeline.process(&event).await,
                    }
                }
                info!("router dispatcher stopped");
            }
        });

        Self {
            tx,
            dispatcher,
            workers: worker_handles,
        }
    }

    /// Queue an event, applying backpressure when the queue is full.
    pub async fn submit(&self, event: RiskEvent) -> RouterResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RouterError::QueueClosed)
    }

    /// Stop intake and drain every queued event before returning.
    pub async fn shutdown(self) {
        drop(self.tx);
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
        info!("event router drained and stopped");
    }
}

fn worker_index(key: &str, workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % workers as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_index_is_stable_and_in_range() {
        for workers in 1..8 {
            let a = worker_index("acct-1", workers);
            assert_eq!(a, worker_index("acct-1", workers));
            assert!(a < workers);
        }
    }
}
