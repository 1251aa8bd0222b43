//! Tracker error types.

use riskd_core::ContractId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("No quote seen for {0}")]
    UnknownContract(ContractId),

    #[error("Stale quote for {contract_id}: {age_ms}ms old")]
    StaleQuote {
        contract_id: ContractId,
        age_ms: i64,
    },

    #[error("Metadata fetch timed out for {0}")]
    FetchTimeout(ContractId),

    #[error("Metadata fetch failed for {contract_id}: {message}")]
    FetchFailed {
        contract_id: ContractId,
        message: String,
    },
}

impl TrackerError {
    /// Errors the caller may retry (transient I/O conditions).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FetchTimeout(_) | Self::FetchFailed { .. })
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;
