//! Event routing for riskd.
//!
//! A bounded queue feeds an account-sharded worker pool; each event
//! runs the fixed pipeline of state update, lockout gate, rule
//! evaluation, and action dispatch.

pub mod error;
pub mod pipeline;
pub mod router;

pub use error::{RouterError, RouterResult};
pub use pipeline::{EventOutcome, Pipeline};
pub use router::{EventRouter, RouterConfig};
