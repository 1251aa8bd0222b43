//! State manager error types.

use riskd_core::AccountId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    /// Out-of-order or duplicate event; dropped, never applied.
    #[error("Stale event for {account_id}: sequence {sequence} <= last applied {last}")]
    StaleSequence {
        account_id: AccountId,
        sequence: u64,
        last: u64,
    },
}

pub type StateResult<T> = Result<T, StateError>;
