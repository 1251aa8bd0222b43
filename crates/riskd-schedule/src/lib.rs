//! Trading calendar and the daily reset scheduler for riskd.
//!
//! Per-day aggregates reset exactly once per trading-day boundary,
//! guarded by a persisted watermark that survives restarts.

pub mod calendar;
pub mod error;
pub mod scheduler;

pub use calendar::TradingCalendar;
pub use error::{ScheduleError, ScheduleResult};
pub use scheduler::{ResetCallback, ResetScheduler};
