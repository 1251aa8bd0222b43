//! Rule engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    /// Invalid rule configuration; fails startup, never evaluation.
    #[error("Invalid {rule} configuration: {message}")]
    InvalidConfig { rule: &'static str, message: String },
}

impl RuleError {
    pub fn invalid(rule: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            rule,
            message: message.into(),
        }
    }
}

pub type RuleResult<T> = Result<T, RuleError>;
