//! Currency reference data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PeerfxError, Result, constants};

/// A tradeable currency.
///
/// `value` is the number of units of this currency equivalent to one
/// reference unit (one USD-equivalent). USD itself has `value = 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// Unique, case-sensitive key (e.g. `"NGN"`).
    pub symbol: String,
    pub name: String,
    /// Units per reference unit.
    pub value: Decimal,
}

impl Currency {
    #[must_use]
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, value: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            value,
        }
    }

    /// Check the definition is usable as reference data.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.is_empty() || self.symbol.len() > constants::MAX_CURRENCY_SYMBOL_LEN {
            return Err(PeerfxError::InvalidCurrency {
                reason: format!(
                    "symbol must be 1..={} characters",
                    constants::MAX_CURRENCY_SYMBOL_LEN
                ),
            });
        }
        if !self.symbol.chars().all(char::is_alphanumeric) {
            return Err(PeerfxError::InvalidCurrency {
                reason: format!("symbol `{}` contains special characters", self.symbol),
            });
        }
        if self.name.trim().is_empty() || self.name.len() > constants::MAX_CURRENCY_NAME_LEN {
            return Err(PeerfxError::InvalidCurrency {
                reason: format!(
                    "name must be 1..={} characters",
                    constants::MAX_CURRENCY_NAME_LEN
                ),
            });
        }
        if self.value <= Decimal::ZERO {
            return Err(PeerfxError::InvalidCurrency {
                reason: format!("value per reference unit must be positive, got {}", self.value),
            });
        }
        Ok(())
    }

    /// Convert an amount of this currency into reference units.
    #[must_use]
    pub fn to_reference(&self, amount: Decimal) -> Option<Decimal> {
        amount.checked_div(self.value)
    }

    /// Convert reference units into an amount of this currency.
    #[must_use]
    pub fn from_reference(&self, reference: Decimal) -> Option<Decimal> {
        reference.checked_mul(self.value)
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Currency {
    pub fn usd() -> Self {
        Self::new("USD", "US Dollar", Decimal::ONE)
    }

    pub fn ngn() -> Self {
        Self::new("NGN", "Nigerian Naira", Decimal::new(455, 0))
    }

    pub fn jpy() -> Self {
        Self::new("JPY", "Japanese Yen", Decimal::new(125, 0))
    }
}
