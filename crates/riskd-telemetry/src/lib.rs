//! Prometheus metrics and structured logging for riskd.
//!
//! - Prometheus counters/histograms for events, rules, enforcement, lockouts
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
