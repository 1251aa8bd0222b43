//! Application configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use riskd_core::{Money, Price};
use riskd_enforce::RetryPolicy;
use riskd_router::RouterConfig;
use riskd_rules::RulesConfig;
use riskd_schedule::TradingCalendar;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for durable lockout/counter/watermark state.
    pub data_dir: PathBuf,
    /// Accounts pre-registered with the reset scheduler. Accounts seen
    /// on the event stream are registered on first contact either way.
    pub accounts: Vec<String>,
    pub router: RouterSection,
    pub reset: ResetSection,
    pub enforcement: EnforcementSection,
    pub market_data: MarketDataSection,
    /// Static contract metadata served by the built-in source.
    pub contracts: Vec<ContractSection>,
    pub source: SourceSection,
    pub rules: RulesConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            accounts: Vec::new(),
            router: RouterSection::default(),
            reset: ResetSection::default(),
            enforcement: EnforcementSection::default(),
            market_data: MarketDataSection::default(),
            contracts: Vec::new(),
            source: SourceSection::default(),
            rules: RulesConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1_024,
        }
    }
}

impl RouterSection {
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
        }
    }
}

/// Trading-day boundary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetSection {
    /// Reset time of day, e.g. "17:00:00".
    pub time: String,
    /// IANA timezone the reset time is anchored to.
    pub timezone: String,
    /// Non-trading dates beyond weekends.
    pub holidays: Vec<NaiveDate>,
}

impl Default for ResetSection {
    fn default() -> Self {
        Self {
            time: "17:00:00".to_string(),
            timezone: "America/Chicago".to_string(),
            holidays: Vec::new(),
        }
    }
}

impl ResetSection {
    pub fn calendar(&self) -> AppResult<TradingCalendar> {
        let time = NaiveTime::from_str(&self.time)
            .map_err(|e| AppError::Config(format!("invalid reset.time {:?}: {e}", self.time)))?;
        let tz = Tz::from_str(&self.timezone).map_err(|e| {
            AppError::Config(format!("invalid reset.timezone {:?}: {e}", self.timezone))
        })?;
        let holidays: HashSet<NaiveDate> = self.holidays.iter().copied().collect();
        Ok(TradingCalendar::new(time, tz, holidays))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementSection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: u32,
    pub call_timeout_ms: u64,
}

impl Default for EnforcementSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            multiplier: 2,
            call_timeout_ms: 5_000,
        }
    }
}

impl EnforcementSection {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataSection {
    /// Quote age past which last-price reads degrade.
    pub quote_stale_after_ms: u64,
    pub metadata_fetch_timeout_ms: u64,
    /// TTL stamped onto metadata served by the static source.
    pub metadata_ttl_secs: u64,
}

impl Default for MarketDataSection {
    fn default() -> Self {
        Self {
            quote_stale_after_ms: 5_000,
            metadata_fetch_timeout_ms: 2_000,
            metadata_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSection {
    pub id: String,
    pub tick_size: Price,
    pub tick_value: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// JSONL event file to replay; stdin when unset.
    pub events_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load from a file, or fall back to defaults when it is absent.
    pub fn from_path_or_default(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("failed to parse config: {e}")))
    }

    /// Validate the whole configuration; any failure halts startup.
    pub fn validate(&self) -> AppResult<()> {
        self.rules.validate()?;
        self.reset.calendar()?;
        if self.router.workers == 0 {
            return Err(AppError::Config("router.workers must be positive".into()));
        }
        if self.router.queue_capacity == 0 {
            return Err(AppError::Config(
                "router.queue_capacity must be positive".into(),
            ));
        }
        if self.enforcement.max_attempts == 0 {
            return Err(AppError::Config(
                "enforcement.max_attempts must be positive".into(),
            ));
        }
        for contract in &self.contracts {
            if !contract.tick_size.is_positive() {
                return Err(AppError::Config(format!(
                    "contract {:?} tick_size must be positive",
                    contract.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn full_config_round_trips() {
        let raw = r#"
            data_dir = "/var/lib/riskd"
            accounts = ["acct-1", "acct-2"]

            [router]
            workers = 8
            queue_capacity = 4096

            [reset]
            time = "16:00:00"
            timezone = "America/New_York"
            holidays = ["2026-12-25"]

            [enforcement]
            max_attempts = 5
            base_delay_ms = 100

            [market_data]
            quote_stale_after_ms = 3000

            [[contracts]]
            id = "ESZ6"
            tick_size = "0.25"
            tick_value = "12.50"

            [source]
            events_file = "events.jsonl"

            [rules.daily_loss]
            enabled = true
            limit = "500"
        "#;
        let config: AppConfig = toml::from_str(raw).unwrap();
        config.validate().unwrap();
        assert_eq!(config.router.workers, 8);
        assert_eq!(config.enforcement.max_attempts, 5);
        assert_eq!(config.enforcement.multiplier, 2);
        assert_eq!(config.contracts[0].tick_size, Price::new(dec!(0.25)));
        assert!(config.rules.daily_loss.enabled);
    }

    #[test]
    fn unknown_rule_option_halts_validation_at_parse() {
        let raw = r#"
            [rules.daily_loss]
            enabled = true
            limit = "500"
            lockout_untll_reset = false
        "#;
        assert!(toml::from_str::<AppConfig>(raw).is_err());
    }

    #[test]
    fn bad_timezone_is_a_config_error() {
        let config = AppConfig {
            reset: ResetSection {
                timezone: "Mars/Olympus_Mons".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn defaults_validate() {
        AppConfig::default().validate().unwrap();
    }
}
