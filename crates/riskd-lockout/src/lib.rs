//! Timer scheduling and the durable lockout state machine.
//!
//! `TimerManager`: named, last-writer-wins per-account timers.
//! `LockoutManager`: latching per-account trading restrictions with
//! lazy and timer-driven expiry, persisted across restarts.

pub mod error;
pub mod lockout;
pub mod timer;

pub use error::{LockoutError, LockoutResult};
pub use lockout::{LockoutManager, LOCKOUT_EXPIRY_TIMER};
pub use timer::{TimerCallback, TimerManager};
