//! Router error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    /// The router has shut down and no longer accepts events.
    #[error("event queue closed")]
    QueueClosed,
}

pub type RouterResult<T> = Result<T, RouterError>;
