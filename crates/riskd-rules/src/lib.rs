//! Risk rule engine for riskd.
//!
//! Rules are pure functions over an owned per-account snapshot; the
//! engine runs them in fixed order and resolves conflicting decisions.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod rules;

pub use config::{
    CountType, DailyLossConfig, MaxContractsConfig, MaxOpenOrdersConfig, RulesConfig,
    TradeFrequencyConfig,
};
pub use context::RuleContext;
pub use engine::{resolve_decisions, RiskRule, RuleEngine};
pub use error::{RuleError, RuleResult};
