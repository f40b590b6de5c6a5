//! Wiring for the marketplace plane.

use std::sync::Arc;

use peerfx_types::{DealId, MarketplaceConfig, Result, UserDirectory};

use crate::currency_registry::CurrencyRegistry;
use crate::deal_book::DealBook;
use crate::deal_engine::DealEngine;
use crate::transaction_engine::TransactionEngine;
use crate::transaction_log::TransactionLog;

/// One marketplace: shared stores and the two engines over them.
pub struct Marketplace {
    currencies: Arc<CurrencyRegistry>,
    deals: DealEngine,
    transactions: TransactionEngine,
}

impl Marketplace {
    /// Build a marketplace around `currencies` and an external user directory.
    ///
    /// # Errors
    /// `Configuration` if `config` fails validation.
    pub fn new(
        config: MarketplaceConfig,
        currencies: CurrencyRegistry,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        config.validate()?;
        let currencies = Arc::new(currencies);
        let book = Arc::new(DealBook::new());
        let log = Arc::new(TransactionLog::new());

        let deals = DealEngine::new(
            config.clone(),
            Arc::clone(&currencies),
            Arc::clone(&book),
            Arc::clone(&log),
            Arc::clone(&users),
        );
        let transactions =
            TransactionEngine::new(config.clone(), Arc::clone(&currencies), book, log, users);

        tracing::info!(
            minimum_trade_value = %config.minimum_trade_value,
            max_active_deals = config.max_active_deals,
            currencies = currencies.len(),
            "Marketplace ready"
        );
        Ok(Self {
            currencies,
            deals,
            transactions,
        })
    }

    #[must_use]
    pub fn currencies(&self) -> &CurrencyRegistry {
        &self.currencies
    }

    #[must_use]
    pub fn deals(&self) -> &DealEngine {
        &self.deals
    }

    #[must_use]
    pub fn transactions(&self) -> &TransactionEngine {
        &self.transactions
    }

    /// Delete a deal and every transaction made against it. Returns the
    /// number of transactions removed.
    pub fn delete_deal(&self, id: &DealId) -> Result<usize> {
        self.deals.delete(id).map(|(_, dropped)| dropped)
    }
}
