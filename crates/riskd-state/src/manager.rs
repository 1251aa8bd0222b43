//! Authoritative per-account record of open positions and working orders.
//!
//! The arena is a `DashMap` of per-account records, each guarded by its
//! own mutex: one writer per account, while readers take cloned
//! snapshots. Account-scoped events carry a monotonic sequence number;
//! anything at or below the last applied one is dropped before any
//! mutation, which also makes duplicate delivery idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::prelude::Signed;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use riskd_core::{
    AccountId, ContractId, Order, OrderEvent, OrderId, Position, PositionEvent, PositionSide,
    Price, Size, TradeEvent,
};

use crate::error::{StateError, StateResult};

#[derive(Debug, Default)]
struct AccountRecord {
    positions: HashMap<ContractId, Position>,
    orders: HashMap<OrderId, Order>,
    last_sequence: u64,
}

impl AccountRecord {
    /// Sequence gate: applied exactly once per event, before any mutation.
    fn gate(&mut self, account_id: &AccountId, sequence: u64) -> StateResult<()> {
        if sequence <= self.last_sequence {
            return Err(StateError::StaleSequence {
                account_id: account_id.clone(),
                sequence,
                last: self.last_sequence,
            });
        }
        self.last_sequence = sequence;
        Ok(())
    }
}

/// Per-account state arena.
#[derive(Default)]
pub struct StateManager {
    accounts: DashMap<AccountId, Arc<Mutex<AccountRecord>>>,
}

impl StateManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, account_id: &AccountId) -> Arc<Mutex<AccountRecord>> {
        self.accounts
            .entry(account_id.clone())
            .or_default()
            .clone()
    }

    /// Apply a position fill delta, netting it into the open position.
    ///
    /// Returns the resulting position; a position netted to zero is
    /// removed and returned flat.
    pub fn apply_position_event(&self, event: &PositionEvent) -> StateResult<Position> {
        let record = self.record(&event.account_id);
        let mut rec = record.lock();
        rec.gate(&event.account_id, event.sequence)?;

        let delta = Decimal::from(event.side.sign()) * event.size.inner();
        let updated = match rec.positions.get(&event.contract_id).cloned() {
            None => {
                let pos = position_from_delta(event, delta, event.timestamp);
                if let Some(ref p) = pos {
                    rec.positions.insert(event.contract_id.clone(), p.clone());
                }
                pos.unwrap_or_else(|| flat_position(event))
            }
            Some(existing) => {
                let current = existing.signed_size();
                let new = current + delta;

                if new.is_zero() {
                    rec.positions.remove(&event.contract_id);
                    let mut closed = existing;
                    closed.size = Size::ZERO;
                    debug!(account = %event.account_id, contract = %event.contract_id,
                        "position flattened");
                    closed
                } else if new.signum() == current.signum() {
                    let mut pos = existing;
                    if delta.signum() == current.signum() {
                        // Adding to the position: size-weighted average entry.
                        let total = current.abs() + delta.abs();
                        pos.average_price = Price::new(
                            (pos.average_price.inner() * current.abs()
                                + event.price.inner() * delta.abs())
                                / total,
                        );
                    }
                    // Reducing keeps the entry price.
                    pos.size = Size::new(new.abs());
                    rec.positions.insert(event.contract_id.clone(), pos.clone());
                    pos
                } else {
                    // Crossed through zero: new position on the other side
                    // at the fill price, residual size.
                    let pos = Position {
                        account_id: event.account_id.clone(),
                        contract_id: event.contract_id.clone(),
                        side: side_of(new),
                        size: Size::new(new.abs()),
                        average_price: event.price,
                        opened_at: event.timestamp,
                    };
                    rec.positions.insert(event.contract_id.clone(), pos.clone());
                    pos
                }
            }
        };

        Ok(updated)
    }

    /// Upsert an order snapshot; terminal statuses leave the working set.
    pub fn apply_order_event(&self, event: &OrderEvent) -> StateResult<Order> {
        let record = self.record(&event.order.account_id);
        let mut rec = record.lock();
        rec.gate(&event.order.account_id, event.sequence)?;

        let mut order = event.order.clone();
        if order.filled_size > order.size {
            warn!(order = %order.order_id, filled = %order.filled_size, size = %order.size,
                "filled_size exceeds size, clamping");
            order.filled_size = order.size;
        }

        if order.status.is_terminal() {
            rec.orders.remove(&order.order_id);
        } else {
            rec.orders.insert(order.order_id.clone(), order.clone());
        }
        Ok(order)
    }

    /// Gate a trade event's sequence without mutating positions.
    ///
    /// Trade effects on PnL and frequency live in their own trackers;
    /// the state manager only owns the per-account event ordering.
    pub fn apply_trade_event(&self, event: &TradeEvent) -> StateResult<()> {
        let record = self.record(&event.trade.account_id);
        let mut rec = record.lock();
        rec.gate(&event.trade.account_id, event.sequence)
    }

    /// Snapshot of one open position.
    pub fn position(&self, account_id: &AccountId, contract_id: &ContractId) -> Option<Position> {
        let record = self.accounts.get(account_id)?;
        let rec = record.lock();
        rec.positions.get(contract_id).cloned()
    }

    /// Snapshot of all open positions for an account.
    pub fn positions(&self, account_id: &AccountId) -> Vec<Position> {
        match self.accounts.get(account_id) {
            None => Vec::new(),
            Some(record) => {
                let rec = record.lock();
                rec.positions.values().cloned().collect()
            }
        }
    }

    /// Snapshot of all working (non-terminal) orders for an account.
    pub fn open_orders(&self, account_id: &AccountId) -> Vec<Order> {
        match self.accounts.get(account_id) {
            None => Vec::new(),
            Some(record) => {
                let rec = record.lock();
                rec.orders.values().cloned().collect()
            }
        }
    }

    /// Last applied sequence for an account (0 if never seen).
    pub fn last_sequence(&self, account_id: &AccountId) -> u64 {
        self.accounts
            .get(account_id)
            .map(|r| r.lock().last_sequence)
            .unwrap_or(0)
    }
}

fn side_of(signed: Decimal) -> PositionSide {
    if signed.is_sign_negative() {
        PositionSide::Short
    } else {
        PositionSide::Long
    }
}

fn position_from_delta(
    event: &PositionEvent,
    delta: Decimal,
    opened_at: DateTime<Utc>,
) -> Option<Position> {
    if delta.is_zero() {
        return None;
    }
    Some(Position {
        account_id: event.account_id.clone(),
        contract_id: event.contract_id.clone(),
        side: side_of(delta),
        size: Size::new(delta.abs()),
        average_price: event.price,
        opened_at,
    })
}

fn flat_position(event: &PositionEvent) -> Position {
    Position {
        account_id: event.account_id.clone(),
        contract_id: event.contract_id.clone(),
        side: PositionSide::Long,
        size: Size::ZERO,
        average_price: event.price,
        opened_at: event.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskd_core::{OrderSide, OrderStatus, OrderType};
    use rust_decimal_macros::dec;

    fn fill(seq: u64, side: OrderSide, size: Decimal, price: Decimal) -> PositionEvent {
        PositionEvent {
            account_id: AccountId::from("acct-1"),
            contract_id: ContractId::from("ESZ6"),
            side,
            size: Size::new(size),
            price: Price::new(price),
            sequence: seq,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn final_size_is_signed_sum_of_fills() {
        let state = StateManager::new();
        let fills = [
            fill(1, OrderSide::Buy, dec!(2), dec!(5000)),
            fill(2, OrderSide::Buy, dec!(3), dec!(5001)),
            fill(3, OrderSide::Sell, dec!(1), dec!(5002)),
            fill(4, OrderSide::Sell, dec!(2), dec!(5003)),
        ];
        let mut expected = Decimal::ZERO;
        for f in &fills {
            expected += Decimal::from(f.side.sign()) * f.size.inner();
            state.apply_position_event(f).unwrap();
        }

        let pos = state
            .position(&AccountId::from("acct-1"), &ContractId::from("ESZ6"))
            .unwrap();
        assert_eq!(pos.signed_size(), expected);
        assert_eq!(pos.signed_size(), dec!(2));
    }

    #[test]
    fn out_of_order_and_duplicate_events_are_dropped() {
        let state = StateManager::new();
        state
            .apply_position_event(&fill(5, OrderSide::Buy, dec!(1), dec!(5000)))
            .unwrap();

        let stale = state.apply_position_event(&fill(3, OrderSide::Buy, dec!(9), dec!(5000)));
        assert!(matches!(stale, Err(StateError::StaleSequence { .. })));

        let dup = state.apply_position_event(&fill(5, OrderSide::Buy, dec!(9), dec!(5000)));
        assert!(matches!(dup, Err(StateError::StaleSequence { .. })));

        let pos = state
            .position(&AccountId::from("acct-1"), &ContractId::from("ESZ6"))
            .unwrap();
        assert_eq!(pos.size, Size::new(dec!(1)));
    }

    #[test]
    fn crossing_through_zero_flips_side_at_fill_price() {
        let state = StateManager::new();
        state
            .apply_position_event(&fill(1, OrderSide::Buy, dec!(2), dec!(5000)))
            .unwrap();
        let pos = state
            .apply_position_event(&fill(2, OrderSide::Sell, dec!(5), dec!(4990)))
            .unwrap();

        assert_eq!(pos.side, PositionSide::Short);
        assert_eq!(pos.size, Size::new(dec!(3)));
        assert_eq!(pos.average_price, Price::new(dec!(4990)));
    }

    #[test]
    fn adding_updates_weighted_average_reducing_keeps_it() {
        let state = StateManager::new();
        state
            .apply_position_event(&fill(1, OrderSide::Buy, dec!(1), dec!(5000)))
            .unwrap();
        let pos = state
            .apply_position_event(&fill(2, OrderSide::Buy, dec!(1), dec!(5002)))
            .unwrap();
        assert_eq!(pos.average_price, Price::new(dec!(5001)));

        let pos = state
            .apply_position_event(&fill(3, OrderSide::Sell, dec!(1), dec!(5010)))
            .unwrap();
        assert_eq!(pos.average_price, Price::new(dec!(5001)));
        assert_eq!(pos.size, Size::ONE);
    }

    #[test]
    fn flattening_removes_the_position() {
        let state = StateManager::new();
        state
            .apply_position_event(&fill(1, OrderSide::Buy, dec!(2), dec!(5000)))
            .unwrap();
        let pos = state
            .apply_position_event(&fill(2, OrderSide::Sell, dec!(2), dec!(5005)))
            .unwrap();

        assert!(pos.is_flat());
        assert!(state
            .position(&AccountId::from("acct-1"), &ContractId::from("ESZ6"))
            .is_none());
    }

    fn order_event(seq: u64, status: OrderStatus) -> OrderEvent {
        OrderEvent {
            order: Order {
                order_id: OrderId::from("ord-1"),
                account_id: AccountId::from("acct-1"),
                contract_id: ContractId::from("ESZ6"),
                side: OrderSide::Buy,
                size: Size::new(dec!(2)),
                order_type: OrderType::Limit,
                limit_price: Some(Price::new(dec!(4999))),
                stop_price: None,
                status,
                filled_size: Size::ZERO,
                fill_price: None,
                created_at: Utc::now(),
            },
            sequence: seq,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn terminal_order_leaves_working_set() {
        let state = StateManager::new();
        state.apply_order_event(&order_event(1, OrderStatus::Working)).unwrap();
        assert_eq!(state.open_orders(&AccountId::from("acct-1")).len(), 1);

        state.apply_order_event(&order_event(2, OrderStatus::Cancelled)).unwrap();
        assert!(state.open_orders(&AccountId::from("acct-1")).is_empty());
    }

    #[test]
    fn overfilled_order_is_clamped() {
        let state = StateManager::new();
        let mut event = order_event(1, OrderStatus::PartiallyFilled);
        event.order.filled_size = Size::new(dec!(99));
        let order = state.apply_order_event(&event).unwrap();
        assert_eq!(order.filled_size, order.size);
    }

    #[test]
    fn trade_events_share_the_sequence_gate() {
        let state = StateManager::new();
        state
            .apply_position_event(&fill(2, OrderSide::Buy, dec!(1), dec!(5000)))
            .unwrap();

        let trade = TradeEvent {
            trade: riskd_core::Trade {
                account_id: AccountId::from("acct-1"),
                contract_id: ContractId::from("ESZ6"),
                side: OrderSide::Sell,
                size: Size::ONE,
                price: Price::new(dec!(5001)),
                realized_pnl: riskd_core::Money::new(dec!(50)),
                fees: riskd_core::Money::new(dec!(2)),
                executed_at: Utc::now(),
            },
            sequence: 1,
        };
        assert!(state.apply_trade_event(&trade).is_err());
        assert_eq!(state.last_sequence(&AccountId::from("acct-1")), 2);
    }
}
