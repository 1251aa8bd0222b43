//! Core domain types for the riskd enforcement daemon.
//!
//! Contains identifier newtypes, exact-decimal value types, the account
//! data model (positions, orders, trades, quotes, contract metadata),
//! inbound event types, lockout records, and enforcement decisions.

pub mod daily;
pub mod decimal;
pub mod decision;
pub mod event;
pub mod ids;
pub mod lockout;
pub mod market;
pub mod order;
pub mod position;

pub use daily::{DailyCounters, UnrealizedPnl};
pub use decimal::{Money, Price, Size};
pub use decision::{EnforcementAction, EnforcementDecision};
pub use event::{OrderEvent, PositionEvent, RiskEvent, TradeEvent};
pub use ids::{AccountId, ContractId, OrderId};
pub use lockout::{LockoutKind, LockoutRecord};
pub use market::{ContractMetadata, Quote, Trade};
pub use order::{Order, OrderSide, OrderStatus, OrderType};
pub use position::{Position, PositionSide};
