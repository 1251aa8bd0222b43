//! Realized and unrealized PnL aggregation.
//!
//! Daily realized totals are keyed by account and trading day and
//! persisted through the state store so a restart mid-session keeps the
//! running loss total. Unrealized PnL marks open positions against the
//! latest fresh quote; positions without fresh market data are excluded
//! and the result flagged partial rather than failing the computation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use riskd_core::{AccountId, ContractId, DailyCounters, Money, Price, UnrealizedPnl};
use riskd_persistence::StateStore;
use riskd_state::StateManager;
use riskd_trackers::{ContractCache, QuoteTracker};

use crate::error::PnlResult;

/// Per-account PnL aggregation over state, quotes and contract metadata.
pub struct PnlTracker {
    state: Arc<StateManager>,
    quotes: Arc<QuoteTracker>,
    contracts: Arc<ContractCache>,
    store: Arc<StateStore>,
    daily: DashMap<AccountId, DailyCounters>,
}

impl PnlTracker {
    /// Load persisted daily counters and wire the market-data sources.
    pub fn new(
        state: Arc<StateManager>,
        quotes: Arc<QuoteTracker>,
        contracts: Arc<ContractCache>,
        store: Arc<StateStore>,
    ) -> PnlResult<Self> {
        let daily = DashMap::new();
        for (account, counters) in store.load_daily_counters()? {
            daily.insert(account, counters);
        }
        Ok(Self {
            state,
            quotes,
            contracts,
            store,
            daily,
        })
    }

    /// Record a realized PnL event and return the new daily total.
    ///
    /// `fees` is a non-negative cost and reduces the daily total.
    /// Counters are created lazily for the UTC date of `at`; the reset
    /// scheduler re-dates them at each trading-day boundary.
    pub fn record_realized(
        &self,
        account_id: &AccountId,
        contract_id: &ContractId,
        pnl: Money,
        fees: Money,
        at: DateTime<Utc>,
    ) -> Money {
        let mut entry = self
            .daily
            .entry(account_id.clone())
            .or_insert_with(|| DailyCounters::new(account_id.clone(), at.date_naive()));

        entry.realized_pnl += pnl - fees;
        entry.trade_count += 1;
        if pnl.is_negative() {
            entry.loss_count += 1;
        }
        let total = entry.realized_pnl;
        debug!(account = %account_id, contract = %contract_id, pnl = %pnl,
            daily_total = %total, "realized pnl recorded");
        drop(entry);

        self.persist();
        total
    }

    /// Current daily counters (zeroed for today's UTC date if unseen).
    pub fn daily(&self, account_id: &AccountId) -> DailyCounters {
        self.daily
            .get(account_id)
            .map(|c| c.clone())
            .unwrap_or_else(|| DailyCounters::new(account_id.clone(), Utc::now().date_naive()))
    }

    /// Unrealized PnL over the account's open positions.
    ///
    /// `(last - average_price) * signed_size * tick_value / tick_size`
    /// per position. Positions with a stale/missing quote or without
    /// fresh cached metadata are excluded and the result marked partial.
    pub fn unrealized(&self, account_id: &AccountId) -> UnrealizedPnl {
        let mut result = UnrealizedPnl::default();

        for position in self.state.positions(account_id) {
            let Some(last) = self.quotes.try_last_price(&position.contract_id) else {
                warn!(account = %account_id, contract = %position.contract_id,
                    "stale quote, excluding from unrealized pnl");
                result.exclude(position.contract_id.clone());
                continue;
            };
            let Some(point_value) = self
                .contracts
                .peek(&position.contract_id)
                .and_then(|m| m.point_value())
            else {
                warn!(account = %account_id, contract = %position.contract_id,
                    "no fresh metadata, excluding from unrealized pnl");
                result.exclude(position.contract_id.clone());
                continue;
            };

            let move_points = price_diff(last, position.average_price);
            result.total += Money::new(move_points * position.signed_size() * point_value);
        }

        result
    }

    /// Daily-boundary reset: zero the counters onto the new trading day.
    pub fn reset_daily(&self, account_id: &AccountId, date: NaiveDate) {
        self.daily
            .insert(account_id.clone(), DailyCounters::new(account_id.clone(), date));
        self.persist();
    }

    fn persist(&self) {
        let snapshot: HashMap<AccountId, DailyCounters> = self
            .daily
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        if let Err(e) = self.store.save_daily_counters(&snapshot) {
            warn!(?e, "failed to persist daily counters");
        }
    }
}

fn price_diff(a: Price, b: Price) -> rust_decimal::Decimal {
    a.inner() - b.inner()
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskd_core::{
        ContractMetadata, OrderSide, PositionEvent, Quote, Size,
    };
    use riskd_trackers::MockMetadataSource;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        state: Arc<StateManager>,
        quotes: Arc<QuoteTracker>,
        contracts: Arc<ContractCache>,
        pnl: PnlTracker,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(StateStore::open(dir.path()).unwrap());
        let state = Arc::new(StateManager::new());
        let quotes = Arc::new(QuoteTracker::default());
        let source = Arc::new(MockMetadataSource::new(ContractMetadata {
            contract_id: ContractId::from("ESZ6"),
            tick_size: Price::new(dec!(0.25)),
            tick_value: Money::new(dec!(12.50)),
            fetched_at: Utc::now(),
            ttl_secs: 300,
        }));
        let contracts = Arc::new(ContractCache::new(source, Duration::from_secs(2)));
        let pnl = PnlTracker::new(
            state.clone(),
            quotes.clone(),
            contracts.clone(),
            store,
        )
        .unwrap();
        Fixture {
            _dir: dir,
            state,
            quotes,
            contracts,
            pnl,
        }
    }

    fn open_long(state: &StateManager, seq: u64, size: rust_decimal::Decimal, price: rust_decimal::Decimal) {
        state
            .apply_position_event(&PositionEvent {
                account_id: AccountId::from("acct-1"),
                contract_id: ContractId::from("ESZ6"),
                side: OrderSide::Buy,
                size: Size::new(size),
                price: Price::new(price),
                sequence: seq,
                timestamp: Utc::now(),
            })
            .unwrap();
    }

    fn quote(last: rust_decimal::Decimal) -> Quote {
        Quote {
            contract_id: ContractId::from("ESZ6"),
            bid: Price::new(last - dec!(0.25)),
            ask: Price::new(last + dec!(0.25)),
            last: Price::new(last),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn realized_accumulates_and_counts_losses() {
        let f = fixture();
        let account = AccountId::from("acct-1");
        let contract = ContractId::from("ESZ6");
        let now = Utc::now();

        for _ in 0..3 {
            f.pnl
                .record_realized(&account, &contract, Money::new(dec!(-200)), Money::ZERO, now);
        }
        let daily = f.pnl.daily(&account);
        assert_eq!(daily.realized_pnl, Money::new(dec!(-600)));
        assert_eq!(daily.trade_count, 3);
        assert_eq!(daily.loss_count, 3);
    }

    #[test]
    fn fees_reduce_the_daily_total() {
        let f = fixture();
        let account = AccountId::from("acct-1");
        let total = f.pnl.record_realized(
            &account,
            &ContractId::from("ESZ6"),
            Money::new(dec!(100)),
            Money::new(dec!(4)),
            Utc::now(),
        );
        assert_eq!(total, Money::new(dec!(96)));
        assert_eq!(f.pnl.daily(&account).loss_count, 0);
    }

    #[tokio::test]
    async fn unrealized_marks_against_last_quote() {
        let f = fixture();
        let account = AccountId::from("acct-1");
        let contract = ContractId::from("ESZ6");

        open_long(&f.state, 1, dec!(2), dec!(5000.00));
        f.quotes.update_quote(quote(dec!(5001.00)));
        f.contracts.get_metadata(&contract).await.unwrap();

        // 1 point * 2 contracts * $50/point = $100
        let unrealized = f.pnl.unrealized(&account);
        assert_eq!(unrealized.total, Money::new(dec!(100.00)));
        assert!(!unrealized.partial);
        assert!(unrealized.excluded.is_empty());
    }

    #[tokio::test]
    async fn stale_quote_excludes_position_and_flags_partial() {
        let f = fixture();
        let account = AccountId::from("acct-1");
        let contract = ContractId::from("ESZ6");

        open_long(&f.state, 1, dec!(2), dec!(5000.00));
        f.contracts.get_metadata(&contract).await.unwrap();
        f.quotes.update_quote(Quote {
            observed_at: Utc::now() - chrono::Duration::seconds(30),
            ..quote(dec!(5001.00))
        });

        let unrealized = f.pnl.unrealized(&account);
        assert_eq!(unrealized.total, Money::ZERO);
        assert!(unrealized.partial);
        assert_eq!(unrealized.excluded, vec![contract]);
    }

    #[test]
    fn missing_metadata_excludes_position() {
        let f = fixture();
        open_long(&f.state, 1, dec!(1), dec!(5000.00));
        f.quotes.update_quote(quote(dec!(5001.00)));

        let unrealized = f.pnl.unrealized(&AccountId::from("acct-1"));
        assert!(unrealized.partial);
    }

    #[test]
    fn reset_daily_zeroes_onto_new_date() {
        let f = fixture();
        let account = AccountId::from("acct-1");
        f.pnl.record_realized(
            &account,
            &ContractId::from("ESZ6"),
            Money::new(dec!(-100)),
            Money::ZERO,
            Utc::now(),
        );

        let date = NaiveDate::from_ymd_opt(2026, 8, 28).unwrap();
        f.pnl.reset_daily(&account, date);
        let daily = f.pnl.daily(&account);
        assert_eq!(daily.realized_pnl, Money::ZERO);
        assert_eq!(daily.trade_count, 0);
        assert_eq!(daily.date, date);
    }

    #[test]
    fn daily_totals_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let account = AccountId::from("acct-1");
        let mk = |store: Arc<StateStore>| {
            let source = Arc::new(MockMetadataSource::new(ContractMetadata {
                contract_id: ContractId::from("ESZ6"),
                tick_size: Price::new(dec!(0.25)),
                tick_value: Money::new(dec!(12.50)),
                fetched_at: Utc::now(),
                ttl_secs: 300,
            }));
            PnlTracker::new(
                Arc::new(StateManager::new()),
                Arc::new(QuoteTracker::default()),
                Arc::new(ContractCache::new(source, Duration::from_secs(2))),
                store,
            )
            .unwrap()
        };

        {
            let store = Arc::new(StateStore::open(dir.path()).unwrap());
            let pnl = mk(store);
            pnl.record_realized(
                &account,
                &ContractId::from("ESZ6"),
                Money::new(dec!(-250)),
                Money::ZERO,
                Utc::now(),
            );
        }

        let store = Arc::new(StateStore::open(dir.path()).unwrap());
        let pnl = mk(store);
        assert_eq!(pnl.daily(&account).realized_pnl, Money::new(dec!(-250)));
    }
}
