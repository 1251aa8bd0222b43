//! Enforcement action dispatch for riskd.
//!
//! Resolved decisions become sink calls with bounded retry; a failed
//! mandated action escalates to a permanent lockout rather than being
//! dropped.

pub mod enforcer;
pub mod error;
pub mod sink;

pub use enforcer::{ActionResult, Enforcer, RetryPolicy};
pub use error::{SinkError, SinkResult};
pub use sink::{ActionSink, BoxFuture, LoggingSink, MockActionSink, SinkCall};
