//! The external action-sink collaborator.
//!
//! Trait-based so the daemon wires a real upstream client, dry-run mode
//! wires `LoggingSink`, and tests wire the scripted mock.

use std::collections::VecDeque;
use std::pin::Pin;

use parking_lot::Mutex;
use tracing::info;

use riskd_core::{AccountId, ContractId, OrderId, Size};

use crate::error::SinkResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Accepts enforcement commands against the upstream trading venue.
pub trait ActionSink: Send + Sync {
    /// Flatten one contract's position.
    fn close_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        contract_id: &'a ContractId,
    ) -> BoxFuture<'a, SinkResult>;

    /// Cancel one working order.
    fn cancel_order<'a>(
        &'a self,
        account_id: &'a AccountId,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, SinkResult>;

    /// Reduce one contract's position to a target magnitude.
    fn reduce_to_limit<'a>(
        &'a self,
        account_id: &'a AccountId,
        contract_id: &'a ContractId,
        target_size: Size,
    ) -> BoxFuture<'a, SinkResult>;
}

/// Dry-run sink: logs every command and reports success.
pub struct LoggingSink;

impl ActionSink for LoggingSink {
    fn close_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        contract_id: &'a ContractId,
    ) -> BoxFuture<'a, SinkResult> {
        Box::pin(async move {
            info!(account = %account_id, contract = %contract_id, "dry-run: close position");
            Ok(())
        })
    }

    fn cancel_order<'a>(
        &'a self,
        account_id: &'a AccountId,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, SinkResult> {
        Box::pin(async move {
            info!(account = %account_id, order = %order_id, "dry-run: cancel order");
            Ok(())
        })
    }

    fn reduce_to_limit<'a>(
        &'a self,
        account_id: &'a AccountId,
        contract_id: &'a ContractId,
        target_size: Size,
    ) -> BoxFuture<'a, SinkResult> {
        Box::pin(async move {
            info!(account = %account_id, contract = %contract_id, target = %target_size,
                "dry-run: reduce to limit");
            Ok(())
        })
    }
}

/// A command the mock sink received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    ClosePosition(AccountId, ContractId),
    CancelOrder(AccountId, OrderId),
    ReduceToLimit(AccountId, ContractId, Size),
}

/// Scripted sink for tests: pops one result per call, succeeding once
/// the script is exhausted, and records every call it receives.
#[derive(Default)]
pub struct MockActionSink {
    calls: Mutex<Vec<SinkCall>>,
    script: Mutex<VecDeque<SinkResult>>,
}

impl MockActionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the results the next calls will return, in order.
    pub fn script(&self, results: impl IntoIterator<Item = SinkResult>) {
        self.script.lock().extend(results);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn record(&self, call: SinkCall) -> SinkResult {
        self.calls.lock().push(call);
        self.script.lock().pop_front().unwrap_or(Ok(()))
    }
}

impl ActionSink for MockActionSink {
    fn close_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        contract_id: &'a ContractId,
    ) -> BoxFuture<'a, SinkResult> {
        Box::pin(async move {
            self.record(SinkCall::ClosePosition(
                account_id.clone(),
                contract_id.clone(),
            ))
        })
    }

    fn cancel_order<'a>(
        &'a self,
        account_id: &'a AccountId,
        order_id: &'a OrderId,
    ) -> BoxFuture<'a, SinkResult> {
        Box::pin(async move {
            self.record(SinkCall::CancelOrder(account_id.clone(), order_id.clone()))
        })
    }

    fn reduce_to_limit<'a>(
        &'a self,
        account_id: &'a AccountId,
        contract_id: &'a ContractId,
        target_size: Size,
    ) -> BoxFuture<'a, SinkResult> {
        Box::pin(async move {
            self.record(SinkCall::ReduceToLimit(
                account_id.clone(),
                contract_id.clone(),
                target_size,
            ))
        })
    }
}
