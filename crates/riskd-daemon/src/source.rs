//! Built-in collaborator implementations.
//!
//! The real venue integrations live behind the `MetadataSource` and
//! `ActionSink` traits; the daemon ships a config-backed metadata source
//! and replays events from a JSONL file or stdin.

use std::collections::HashMap;

use chrono::Utc;

use riskd_core::{ContractId, ContractMetadata, Money, Price};
use riskd_trackers::{BoxFuture, MetadataSource, TrackerError, TrackerResult};

use crate::config::{ContractSection, MarketDataSection};

/// Serves contract metadata from the `[[contracts]]` config table.
pub struct StaticMetadataSource {
    entries: HashMap<ContractId, (Price, Money)>,
    ttl_secs: u64,
}

impl StaticMetadataSource {
    pub fn from_config(contracts: &[ContractSection], market_data: &MarketDataSection) -> Self {
        Self {
            entries: contracts
                .iter()
                .map(|c| {
                    (
                        ContractId::from(c.id.as_str()),
                        (c.tick_size, c.tick_value),
                    )
                })
                .collect(),
            ttl_secs: market_data.metadata_ttl_secs,
        }
    }
}

impl MetadataSource for StaticMetadataSource {
    fn fetch<'a>(
        &'a self,
        contract_id: &'a ContractId,
    ) -> BoxFuture<'a, TrackerResult<ContractMetadata>> {
        Box::pin(async move {
            let (tick_size, tick_value) = self
                .entries
                .get(contract_id)
                .copied()
                .ok_or_else(|| TrackerError::UnknownContract(contract_id.clone()))?;
            Ok(ContractMetadata {
                contract_id: contract_id.clone(),
                tick_size,
                tick_value,
                fetched_at: Utc::now(),
                ttl_secs: self.ttl_secs,
            })
        })
    }
}
