//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] riskd_persistence::PersistenceError),

    #[error("Lockout error: {0}")]
    Lockout(#[from] riskd_lockout::LockoutError),

    #[error("PnL error: {0}")]
    Pnl(#[from] riskd_pnl::PnlError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] riskd_schedule::ScheduleError),

    #[error("Rule error: {0}")]
    Rule(#[from] riskd_rules::RuleError),

    #[error("Router error: {0}")]
    Router(#[from] riskd_router::RouterError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] riskd_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
