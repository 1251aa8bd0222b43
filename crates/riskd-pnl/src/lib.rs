//! Realized and unrealized PnL tracking for riskd.
//!
//! Daily realized totals persist across restarts; unrealized PnL marks
//! open positions against the freshest available quote and metadata.

pub mod error;
pub mod tracker;

pub use error::{PnlError, PnlResult};
pub use tracker::PnlTracker;
