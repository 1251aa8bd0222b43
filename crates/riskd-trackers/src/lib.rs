//! Market-data and discipline trackers feeding rule evaluation.
//!
//! - `QuoteTracker`: latest bid/ask/last per contract with staleness checks
//! - `ContractCache`: TTL-cached instrument metadata with coalesced fetch
//! - `TradeCounter`: per-account sliding-window trade frequency

pub mod contracts;
pub mod error;
pub mod quotes;
pub mod trades;

pub use contracts::{BoxFuture, ContractCache, MetadataSource, MockMetadataSource};
pub use error::{TrackerError, TrackerResult};
pub use quotes::QuoteTracker;
pub use trades::{TradeCounter, DEFAULT_MAX_WINDOW_SECS};
