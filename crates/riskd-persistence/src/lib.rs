//! Durable state persistence for the riskd daemon.
//!
//! Atomic JSON snapshots for lockout records, daily counters, and the
//! reset scheduler's per-account watermark.

pub mod error;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use store::StateStore;
