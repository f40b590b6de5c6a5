//! Configuration passed explicitly into the registries and engines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{PeerfxError, Result, constants};

/// Marketplace rules and retry budgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Minimum worth of a deal, in reference units.
    pub minimum_trade_value: Decimal,
    /// Maximum active deals per user.
    pub max_active_deals: usize,
    /// Identifier draws per allocation.
    pub id_allocation_attempts: usize,
    /// Re-allocations after the store reports a duplicate identifier.
    pub insert_retry_attempts: usize,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            minimum_trade_value: Decimal::from(constants::DEFAULT_MINIMUM_TRADE_VALUE),
            max_active_deals: constants::DEFAULT_MAX_ACTIVE_DEALS,
            id_allocation_attempts: constants::DEFAULT_ID_ALLOCATION_ATTEMPTS,
            insert_retry_attempts: constants::DEFAULT_INSERT_RETRY_ATTEMPTS,
        }
    }
}

impl MarketplaceConfig {
    /// Load from a JSON document. Missing fields fall back to defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| PeerfxError::Configuration(format!("marketplace config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.minimum_trade_value <= Decimal::ZERO {
            return Err(PeerfxError::Configuration(format!(
                "minimum_trade_value must be positive, got {}",
                self.minimum_trade_value
            )));
        }
        if self.max_active_deals == 0 {
            return Err(PeerfxError::Configuration(
                "max_active_deals must be at least 1".into(),
            ));
        }
        if self.id_allocation_attempts == 0 || self.insert_retry_attempts == 0 {
            return Err(PeerfxError::Configuration(
                "attempt budgets must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Identity subsystem settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Username draws per registration.
    pub username_allocation_attempts: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            username_allocation_attempts: constants::DEFAULT_ID_ALLOCATION_ATTEMPTS,
        }
    }
}

impl IdentityConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| PeerfxError::Configuration(format!("identity config: {e}")))?;
        if config.username_allocation_attempts == 0 {
            return Err(PeerfxError::Configuration(
                "username_allocation_attempts must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marketplace_defaults() {
        let cfg = MarketplaceConfig::default();
        assert_eq!(cfg.minimum_trade_value, Decimal::new(100, 0));
        assert_eq!(cfg.max_active_deals, 5);
        assert_eq!(cfg.id_allocation_attempts, 20);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let cfg = MarketplaceConfig::from_json_str(r#"{"max_active_deals": 2}"#).unwrap();
        assert_eq!(cfg.max_active_deals, 2);
        assert_eq!(cfg.minimum_trade_value, Decimal::new(100, 0));
    }

    #[test]
    fn decimal_loaded_from_string() {
        let cfg = MarketplaceConfig::from_json_str(r#"{"minimum_trade_value": "50.5"}"#).unwrap();
        assert_eq!(cfg.minimum_trade_value, Decimal::new(505, 1));
    }

    #[test]
    fn invalid_values_rejected() {
        for raw in [
            r#"{"minimum_trade_value": "0"}"#,
            r#"{"max_active_deals": 0}"#,
            r#"{"id_allocation_attempts": 0}"#,
            r"not json",
        ] {
            let err = MarketplaceConfig::from_json_str(raw).unwrap_err();
            assert!(matches!(err, PeerfxError::Configuration(_)), "{raw}: {err}");
        }
    }

    #[test]
    fn identity_config_roundtrip() {
        let cfg = IdentityConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, IdentityConfig::default());
        assert!(IdentityConfig::from_json_str(r#"{"username_allocation_attempts": 0}"#).is_err());
    }
}
