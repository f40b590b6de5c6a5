//! Deal lifecycle with business-rule enforcement.
//!
//! ## Checks on create, in order
//!
//! 1. Owner is known and active
//! 2. Amount, rate and bank details are well formed; currencies differ
//! 3. Both currencies resolve in the [`CurrencyRegistry`]
//! 4. `fund_amount` is worth at least the configured minimum trade value
//! 5. Owner holds fewer than `max_active_deals` active deals
//! 6. A fresh identifier is allocated and the deal is persisted
//!
//! Steps 5 and 6 are repeated atomically inside [`DealBook::insert_capped`].
//! A duplicate identifier reported by the store triggers a bounded
//! re-allocation.

use std::sync::Arc;

use peerfx_types::{
    BankDetails, Currency, DealFilter, DealId, DealUpdate, ExchangeDeal, IdentifierAllocator,
    MarketplaceConfig, NewDeal, PeerfxError, Result, UserDirectory, UserId,
};
use rust_decimal::Decimal;

use crate::currency_registry::CurrencyRegistry;
use crate::deal_book::DealBook;
use crate::transaction_log::TransactionLog;

/// The fields the business rules look at, borrowed from either a request
/// or a stored deal.
struct Terms<'a> {
    fund_currency: &'a str,
    fund_amount: Decimal,
    exchange_currency: &'a str,
    exchange_rate: Decimal,
    bank: &'a BankDetails,
}

impl<'a> From<&'a NewDeal> for Terms<'a> {
    fn from(req: &'a NewDeal) -> Self {
        Self {
            fund_currency: &req.fund_currency,
            fund_amount: req.fund_amount,
            exchange_currency: &req.exchange_currency,
            exchange_rate: req.exchange_rate,
            bank: &req.bank,
        }
    }
}

impl<'a> From<&'a ExchangeDeal> for Terms<'a> {
    fn from(deal: &'a ExchangeDeal) -> Self {
        Self {
            fund_currency: &deal.fund_currency,
            fund_amount: deal.fund_amount,
            exchange_currency: &deal.exchange_currency,
            exchange_rate: deal.exchange_rate,
            bank: &deal.bank,
        }
    }
}

/// Creates, mutates and removes exchange deals.
pub struct DealEngine {
    config: MarketplaceConfig,
    allocator: IdentifierAllocator,
    currencies: Arc<CurrencyRegistry>,
    book: Arc<DealBook>,
    transactions: Arc<TransactionLog>,
    users: Arc<dyn UserDirectory>,
}

impl DealEngine {
    #[must_use]
    pub fn new(
        config: MarketplaceConfig,
        currencies: Arc<CurrencyRegistry>,
        book: Arc<DealBook>,
        transactions: Arc<TransactionLog>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            allocator: IdentifierAllocator::new(config.id_allocation_attempts.max(1)),
            config,
            currencies,
            book,
            transactions,
            users,
        }
    }

    /// Create a new active deal.
    ///
    /// # Errors
    /// - `UnknownUser` / `UserInactive` for a bad owner
    /// - `InvalidDeal` for malformed terms
    /// - `CurrencyNotFound` if either symbol is not registered
    /// - `BelowMinimumTrade` if the amount is worth too little
    /// - `DealLimitExceeded` if the owner is at the active-deal cap
    /// - `AllocationExhausted` / `DuplicateIdentifier` if no identifier could be placed
    pub fn create(&self, request: NewDeal) -> Result<ExchangeDeal> {
        require_active_user(self.users.as_ref(), request.owner)?;
        let fund = self.check_terms(&Terms::from(&request))?;

        if self.book.active_count(request.owner, None) >= self.config.max_active_deals {
            tracing::warn!(owner = %request.owner, limit = self.config.max_active_deals, "Active deal cap reached");
            return Err(PeerfxError::DealLimitExceeded {
                limit: self.config.max_active_deals,
            });
        }

        let mut last_conflict = None;
        for attempt in 1..=self.config.insert_retry_attempts.max(1) {
            let id = self.allocator.deal_id(|raw| self.book.contains(raw))?;
            let deal = build_deal(id, &request);
            match self.book.insert_capped(deal, self.config.max_active_deals) {
                Ok(stored) => {
                    tracing::info!(
                        deal_id = %stored.id,
                        owner = %stored.owner,
                        fund = %format!("{} {}", stored.fund_amount, fund.symbol),
                        exchange_currency = %stored.exchange_currency,
                        rate = %stored.exchange_rate,
                        "Deal created"
                    );
                    return Ok(stored);
                }
                Err(err @ PeerfxError::DuplicateIdentifier { .. }) => {
                    tracing::debug!(attempt, error = %err, "Deal id collided at insert, re-allocating");
                    last_conflict = Some(err);
                }
                Err(err) => {
                    tracing::warn!(owner = %request.owner, error = %err, "Deal rejected");
                    return Err(err);
                }
            }
        }
        Err(last_conflict.unwrap_or_else(|| {
            PeerfxError::Internal("deal insert retry budget is zero".into())
        }))
    }

    /// Apply a partial update. The minimum trade value and (if the deal ends
    /// up active) the active-deal cap are re-checked on the result.
    ///
    /// # Errors
    /// `DealNotFound`, plus any error [`Self::create`] reports for bad terms.
    pub fn update(&self, id: &DealId, update: &DealUpdate) -> Result<ExchangeDeal> {
        let result = self
            .book
            .update_capped(id, self.config.max_active_deals, |deal| {
                update.apply_to(deal);
                if deal.active {
                    require_active_user(self.users.as_ref(), deal.owner)?;
                }
                self.check_terms(&Terms::from(&*deal)).map(|_| ())
            });
        match &result {
            Ok(deal) => tracing::info!(deal_id = %deal.id, active = deal.active, "Deal updated"),
            Err(err) => tracing::warn!(deal_id = %id, error = %err, "Deal update rejected"),
        }
        result
    }

    /// Re-list an inactive deal. Subject to the same checks as [`Self::update`].
    pub fn activate(&self, id: &DealId) -> Result<ExchangeDeal> {
        self.update(id, &DealUpdate::activate())
    }

    /// Withdraw a deal from the marketplace without deleting it. Never
    /// blocked by the trade rules.
    pub fn deactivate(&self, id: &DealId) -> Result<ExchangeDeal> {
        let deal = self
            .book
            .update_capped(id, self.config.max_active_deals, |deal| {
                deal.active = false;
                Ok(())
            })?;
        tracing::info!(deal_id = %deal.id, "Deal deactivated");
        Ok(deal)
    }

    /// Permanently remove a deal together with its transactions.
    /// Returns the removed deal and the number of transactions dropped.
    ///
    /// # Errors
    /// `DealNotFound` if no deal has this id.
    pub fn delete(&self, id: &DealId) -> Result<(ExchangeDeal, usize)> {
        let (deal, dropped) = self
            .book
            .remove_with(id, |deal| self.transactions.remove_for_deal(&deal.id))?;
        tracing::info!(deal_id = %deal.id, transactions_removed = dropped, "Deal deleted");
        Ok((deal, dropped))
    }

    /// Fetch a deal whether active or not.
    ///
    /// # Errors
    /// `DealNotFound` if no deal has this id.
    pub fn get(&self, id: &DealId) -> Result<ExchangeDeal> {
        self.book
            .get(id)
            .ok_or_else(|| PeerfxError::DealNotFound(id.clone()))
    }

    /// Marketplace listing: active deals passing `filter`, oldest first.
    #[must_use]
    pub fn list(&self, filter: &DealFilter) -> Vec<ExchangeDeal> {
        self.book.list_active(filter)
    }

    /// Every deal owned by `owner`, including inactive ones.
    #[must_use]
    pub fn deals_for_owner(&self, owner: UserId) -> Vec<ExchangeDeal> {
        self.book.for_owner(owner)
    }

    #[must_use]
    pub fn active_count(&self, owner: UserId) -> usize {
        self.book.active_count(owner, None)
    }

    /// Worth of a deal's offered amount in reference units.
    ///
    /// # Errors
    /// `CurrencyNotFound` if the fund currency was removed from the registry.
    pub fn reference_value(&self, deal: &ExchangeDeal) -> Result<Decimal> {
        let fund = self.currencies.lookup(&deal.fund_currency)?;
        deal.reference_value(&fund)
            .ok_or_else(|| PeerfxError::Internal("reference value overflow".into()))
    }

    #[must_use]
    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    /// Validate terms and return the resolved fund currency.
    fn check_terms(&self, terms: &Terms<'_>) -> Result<Currency> {
        if terms.fund_amount <= Decimal::ZERO {
            return Err(PeerfxError::InvalidDeal {
                reason: "fund_amount must be positive".into(),
            });
        }
        if terms.exchange_rate <= Decimal::ZERO {
            return Err(PeerfxError::InvalidDeal {
                reason: "exchange_rate must be positive".into(),
            });
        }
        if terms.fund_currency == terms.exchange_currency {
            return Err(PeerfxError::InvalidDeal {
                reason: format!("cannot exchange {} for itself", terms.fund_currency),
            });
        }
        terms.bank.validate()?;

        let fund = self.currencies.lookup(terms.fund_currency)?;
        self.currencies.lookup(terms.exchange_currency)?;

        let minimum = fund
            .from_reference(self.config.minimum_trade_value)
            .ok_or_else(|| PeerfxError::Internal("minimum trade value overflow".into()))?;
        if terms.fund_amount < minimum {
            tracing::warn!(
                amount = %terms.fund_amount,
                minimum = %minimum,
                currency = %fund.symbol,
                "Deal below minimum trade value"
            );
            return Err(PeerfxError::BelowMinimumTrade {
                minimum,
                currency: fund.symbol,
            });
        }
        Ok(fund)
    }
}

fn build_deal(id: DealId, request: &NewDeal) -> ExchangeDeal {
    let now = chrono::Utc::now();
    ExchangeDeal {
        id,
        owner: request.owner,
        fund_currency: request.fund_currency.clone(),
        fund_amount: request.fund_amount,
        exchange_currency: request.exchange_currency.clone(),
        exchange_rate: request.exchange_rate,
        bank: request.bank.clone(),
        exchange_address: request.exchange_address.clone(),
        active: true,
        created_at: now,
        updated_at: now,
        sequence: 0,
    }
}

/// The referenced user must exist and be active.
pub(crate) fn require_active_user(users: &dyn UserDirectory, user: UserId) -> Result<()> {
    match users.snapshot(&user) {
        None => Err(PeerfxError::UnknownUser(user)),
        Some(snapshot) if !snapshot.active => Err(PeerfxError::UserInactive(user)),
        Some(_) => Ok(()),
    }
}
