//! Per-account position and working-order state for riskd.
//!
//! Single writer per account with sequence-gated, idempotent event
//! application; readers take cloned snapshots.

pub mod error;
pub mod manager;

pub use error::{StateError, StateResult};
pub use manager::StateManager;
