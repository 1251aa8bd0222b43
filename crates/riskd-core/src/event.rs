//! Typed inbound events delivered by the event-source collaborator.
//!
//! Account-scoped events carry a per-account monotonic sequence number;
//! the state manager drops anything at or below the last applied one.
//! Quote updates are market-scoped and carry no sequence.

use crate::{AccountId, ContractId, Order, OrderSide, Price, Quote, Size, Trade};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A position fill delta for one account/contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEvent {
    pub account_id: AccountId,
    pub contract_id: ContractId,
    pub side: OrderSide,
    /// Fill magnitude; direction comes from `side`.
    pub size: Size,
    pub price: Price,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// A full order snapshot from the upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order: Order,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// An executed trade with realized PnL attribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub trade: Trade,
    pub sequence: u64,
}

/// All events the router consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskEvent {
    PositionUpdate(PositionEvent),
    OrderUpdate(OrderEvent),
    TradeExecuted(TradeEvent),
    QuoteUpdate(Quote),
}

impl RiskEvent {
    /// Account scope, if any. Quote updates are market-scoped.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            Self::PositionUpdate(e) => Some(&e.account_id),
            Self::OrderUpdate(e) => Some(&e.order.account_id),
            Self::TradeExecuted(e) => Some(&e.trade.account_id),
            Self::QuoteUpdate(_) => None,
        }
    }

    pub fn contract_id(&self) -> &ContractId {
        match self {
            Self::PositionUpdate(e) => &e.contract_id,
            Self::OrderUpdate(e) => &e.order.contract_id,
            Self::TradeExecuted(e) => &e.trade.contract_id,
            Self::QuoteUpdate(q) => &q.contract_id,
        }
    }

    /// Per-account sequence number, if account-scoped.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Self::PositionUpdate(e) => Some(e.sequence),
            Self::OrderUpdate(e) => Some(e.sequence),
            Self::TradeExecuted(e) => Some(e.sequence),
            Self::QuoteUpdate(_) => None,
        }
    }

    /// Short kind label for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PositionUpdate(_) => "position_update",
            Self::OrderUpdate(_) => "order_update",
            Self::TradeExecuted(_) => "trade_executed",
            Self::QuoteUpdate(_) => "quote_update",
        }
    }
}
