//! Lockout subsystem error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockoutError {
    /// A Temporary lockout must carry a future expiry at creation.
    #[error("Temporary lockout requires a future expires_at")]
    InvalidExpiry,

    #[error("Persistence error: {0}")]
    Persistence(#[from] riskd_persistence::PersistenceError),
}

pub type LockoutResult<T> = Result<T, LockoutError>;
