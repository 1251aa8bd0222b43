//! riskd daemon: configuration, wiring, and the run loop.
//!
//! Orchestrates the full component graph: durable store, per-account
//! state, market-data trackers, PnL, lockouts, reset scheduler, rule
//! engine, enforcement, and the event router.

pub mod app;
pub mod config;
pub mod error;
pub mod source;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
