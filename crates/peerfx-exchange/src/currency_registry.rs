//! Currency reference data lookup.
//!
//! Read-mostly: many concurrent deal creations read it, administrative
//! seeding writes it. Readers always observe the last committed write.

use std::collections::HashMap;

use parking_lot::RwLock;
use peerfx_types::{Currency, PeerfxError, Result};

/// Thread-safe symbol → [`Currency`] map.
pub struct CurrencyRegistry {
    currencies: RwLock<HashMap<String, Currency>>,
}

impl CurrencyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            currencies: RwLock::new(HashMap::new()),
        }
    }

    /// Build a registry pre-seeded with `currencies`.
    pub fn with_currencies(currencies: impl IntoIterator<Item = Currency>) -> Result<Self> {
        let registry = Self::new();
        for currency in currencies {
            registry.register(currency)?;
        }
        Ok(registry)
    }

    /// Add a currency.
    ///
    /// # Errors
    /// - `InvalidCurrency` if the definition is malformed
    /// - `DuplicateCurrency` if the symbol is already registered
    pub fn register(&self, currency: Currency) -> Result<()> {
        currency.validate()?;
        let mut map = self.currencies.write();
        if map.contains_key(&currency.symbol) {
            return Err(PeerfxError::DuplicateCurrency(currency.symbol));
        }
        tracing::info!(symbol = %currency.symbol, value = %currency.value, "Currency registered");
        map.insert(currency.symbol.clone(), currency);
        Ok(())
    }

    /// Case-sensitive lookup.
    ///
    /// # Errors
    /// Returns `CurrencyNotFound` if no currency has this symbol.
    pub fn lookup(&self, symbol: &str) -> Result<Currency> {
        self.currencies
            .read()
            .get(symbol)
            .cloned()
            .ok_or_else(|| PeerfxError::CurrencyNotFound(symbol.to_string()))
    }

    /// Currencies whose name / symbol contain the given fragments
    /// (case-insensitive), ordered by name.
    #[must_use]
    pub fn list(&self, name_contains: Option<&str>, symbol_contains: Option<&str>) -> Vec<Currency> {
        let contains = |haystack: &str, needle: Option<&str>| {
            needle.is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        };
        let mut out: Vec<Currency> = self
            .currencies
            .read()
            .values()
            .filter(|c| contains(&c.name, name_contains) && contains(&c.symbol, symbol_contains))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.symbol.cmp(&b.symbol)));
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.currencies.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
