//! The policy set.

mod daily_loss;
mod max_contracts;
mod max_open_orders;
mod trade_frequency;

pub use daily_loss::DailyLossRule;
pub use max_contracts::MaxContractsRule;
pub use max_open_orders::MaxOpenOrdersRule;
pub use trade_frequency::TradeFrequencyRule;
