//! Open-position record.

use crate::{AccountId, ContractId, Price, Size};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Returns 1 for long, -1 for short.
    pub fn sign(&self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Long => Self::Short,
            Self::Short => Self::Long,
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// An open position in one contract.
///
/// `size` is always a positive magnitude; direction lives in `side`.
/// The signed net of all fills since the account last went flat in this
/// contract equals `signed_size()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub account_id: AccountId,
    pub contract_id: ContractId,
    pub side: PositionSide,
    pub size: Size,
    pub average_price: Price,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    /// Signed size: positive for long, negative for short.
    pub fn signed_size(&self) -> Decimal {
        self.size.inner() * Decimal::from(self.side.sign())
    }

    pub fn is_flat(&self) -> bool {
        self.size.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn signed_size_reflects_side() {
        let pos = Position {
            account_id: AccountId::from("acct-1"),
            contract_id: ContractId::from("ESZ6"),
            side: PositionSide::Short,
            size: Size::new(dec!(3)),
            average_price: Price::new(dec!(5000.25)),
            opened_at: Utc::now(),
        };
        assert_eq!(pos.signed_size(), dec!(-3));
        assert!(!pos.is_flat());
    }
}
