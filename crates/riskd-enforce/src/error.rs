//! Sink failure classification.

use thiserror::Error;

/// A failed call against the external action sink.
///
/// The classification drives the retry policy: Transient failures are
/// retried with backoff, everything else escalates immediately.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("transient sink failure: {0}")]
    Transient(String),

    #[error("permanent sink failure: {0}")]
    Permanent(String),

    #[error("sink rejected the action as unauthorized: {0}")]
    Unauthorized(String),
}

impl SinkError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

pub type SinkResult = Result<(), SinkError>;
