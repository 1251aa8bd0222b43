//! PnL tracker error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PnlError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] riskd_persistence::PersistenceError),
}

pub type PnlResult<T> = Result<T, PnlError>;
