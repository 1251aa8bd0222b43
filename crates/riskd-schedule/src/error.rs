//! Scheduler error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Persistence error: {0}")]
    Persistence(#[from] riskd_persistence::PersistenceError),

    #[error("Calendar yields no trading-day boundary within the search horizon")]
    NoBoundary,
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
