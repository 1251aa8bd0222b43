//! Latest-quote tracker with staleness detection.
//!
//! Keeps the most recent bid/ask/last per contract. Reads are
//! non-blocking; a quote older than the configured threshold surfaces
//! as a `StaleQuote` error so callers can degrade instead of pricing
//! positions off dead data.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::trace;

use riskd_core::{ContractId, Price, Quote};

use crate::error::{TrackerError, TrackerResult};

/// Default staleness threshold: 5 seconds.
pub const DEFAULT_STALE_AFTER_MS: i64 = 5_000;

/// Tracks the latest quote per contract.
pub struct QuoteTracker {
    quotes: DashMap<ContractId, Quote>,
    stale_after: Duration,
}

impl Default for QuoteTracker {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_STALE_AFTER_MS))
    }
}

impl QuoteTracker {
    #[must_use]
    pub fn new(stale_after: Duration) -> Self {
        Self {
            quotes: DashMap::new(),
            stale_after,
        }
    }

    /// Record the latest quote for its contract.
    pub fn update_quote(&self, quote: Quote) {
        trace!(contract = %quote.contract_id, last = %quote.last, "quote update");
        self.quotes.insert(quote.contract_id.clone(), quote);
    }

    /// Full latest quote, regardless of age.
    pub fn quote(&self, contract_id: &ContractId) -> Option<Quote> {
        self.quotes.get(contract_id).map(|q| q.clone())
    }

    /// Last traded price, failing on unknown or stale quotes.
    pub fn last_price(&self, contract_id: &ContractId) -> TrackerResult<Price> {
        self.last_price_at(contract_id, Utc::now())
    }

    /// `last_price` against an explicit clock (testable).
    pub fn last_price_at(
        &self,
        contract_id: &ContractId,
        now: DateTime<Utc>,
    ) -> TrackerResult<Price> {
        let quote = self
            .quotes
            .get(contract_id)
            .ok_or_else(|| TrackerError::UnknownContract(contract_id.clone()))?;

        if quote.is_stale(self.stale_after, now) {
            return Err(TrackerError::StaleQuote {
                contract_id: contract_id.clone(),
                age_ms: quote.age_ms(now),
            });
        }
        Ok(quote.last)
    }

    /// Last price if known and fresh, else None. For callers that degrade.
    pub fn try_last_price(&self, contract_id: &ContractId) -> Option<Price> {
        self.last_price(contract_id).ok()
    }

    /// Mid price of the freshest quote, if fresh.
    pub fn mid_price(&self, contract_id: &ContractId) -> Option<Price> {
        let now = Utc::now();
        let quote = self.quotes.get(contract_id)?;
        if quote.is_stale(self.stale_after, now) {
            return None;
        }
        Some(quote.mid())
    }
}
