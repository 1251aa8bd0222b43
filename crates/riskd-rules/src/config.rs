//! Typed, closed-set rule configuration.
//!
//! Each rule recognizes a fixed option set; unknown keys are rejected at
//! deserialization time via `deny_unknown_fields`, never at evaluation.

use riskd_core::{Money, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RuleError, RuleResult};

/// How position exposure is counted against a contract limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountType {
    /// Absolute signed net across positions.
    #[default]
    Net,
    /// Sum of position magnitudes.
    Gross,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MaxContractsConfig {
    pub enabled: bool,
    pub limit: Size,
    pub count_type: CountType,
    /// Flatten everything on breach instead of reducing to the limit.
    pub close_all: bool,
    pub lockout_on_breach: bool,
    /// Cooldown applied when `lockout_on_breach` is set.
    pub lockout_secs: u64,
}

impl Default for MaxContractsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: Size::ZERO,
            count_type: CountType::Net,
            close_all: false,
            lockout_on_breach: false,
            lockout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DailyLossConfig {
    pub enabled: bool,
    /// Positive loss magnitude; breach at daily pnl <= -limit.
    pub limit: Money,
    pub include_unrealized: bool,
    /// Lock the account out until the next trading-day boundary.
    pub lockout_until_reset: bool,
}

impl Default for DailyLossConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: Money::ZERO,
            include_unrealized: false,
            lockout_until_reset: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TradeFrequencyConfig {
    pub enabled: bool,
    pub max_trades: u64,
    pub window_secs: u64,
    pub cooldown_secs: u64,
}

impl Default for TradeFrequencyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_trades: 0,
            window_secs: 60,
            cooldown_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MaxOpenOrdersConfig {
    pub enabled: bool,
    pub limit: usize,
}

/// Full policy-set configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RulesConfig {
    pub max_contracts: MaxContractsConfig,
    pub daily_loss: DailyLossConfig,
    pub trade_frequency: TradeFrequencyConfig,
    pub max_open_orders: MaxOpenOrdersConfig,
}

impl RulesConfig {
    /// Validate enabled rules. Called once at startup; a failure here
    /// halts the daemon.
    pub fn validate(&self) -> RuleResult<()> {
        if self.max_contracts.enabled {
            if self.max_contracts.limit.inner() <= Decimal::ZERO {
                return Err(RuleError::invalid("max_contracts", "limit must be positive"));
            }
            if self.max_contracts.lockout_on_breach && self.max_contracts.lockout_secs == 0 {
                return Err(RuleError::invalid(
                    "max_contracts",
                    "lockout_secs must be positive when lockout_on_breach is set",
                ));
            }
        }
        if self.daily_loss.enabled && self.daily_loss.limit.inner() <= Decimal::ZERO {
            return Err(RuleError::invalid("daily_loss", "limit must be positive"));
        }
        if self.trade_frequency.enabled {
            if self.trade_frequency.max_trades == 0 {
                return Err(RuleError::invalid(
                    "trade_frequency",
                    "max_trades must be positive",
                ));
            }
            if self.trade_frequency.window_secs == 0 {
                return Err(RuleError::invalid(
                    "trade_frequency",
                    "window_secs must be positive",
                ));
            }
            if self.trade_frequency.cooldown_secs == 0 {
                return Err(RuleError::invalid(
                    "trade_frequency",
                    "cooldown_secs must be positive",
                ));
            }
        }
        if self.max_open_orders.enabled && self.max_open_orders.limit == 0 {
            return Err(RuleError::invalid("max_open_orders", "limit must be positive"));
        }
        Ok(())
    }
}
