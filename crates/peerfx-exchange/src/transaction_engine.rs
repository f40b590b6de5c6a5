//! Fulfilment transactions against active deals.
//!
//! A transaction is validated and written while the deal book's read lock
//! is held, so the deal cannot be edited, deactivated or deleted between the
//! check and the write.
//!
//! Transactions do not reduce the deal's `fund_amount`; every transaction
//! is checked against the full amount on offer.

use std::sync::Arc;

use chrono::Utc;
use peerfx_types::{
    Currency, DealId, ExchangeDeal, ExchangeTransaction, IdentifierAllocator, MarketplaceConfig,
    NewTransaction, PeerfxError, Result, TransactionId, TransactionStatus, TransactionUpdate,
    UserDirectory, UserId,
};
use rust_decimal::Decimal;

use crate::currency_registry::CurrencyRegistry;
use crate::deal_book::DealBook;
use crate::deal_engine::require_active_user;
use crate::transaction_log::TransactionLog;

/// Creates and manages [`ExchangeTransaction`]s.
pub struct TransactionEngine {
    config: MarketplaceConfig,
    allocator: IdentifierAllocator,
    currencies: Arc<CurrencyRegistry>,
    book: Arc<DealBook>,
    log: Arc<TransactionLog>,
    users: Arc<dyn UserDirectory>,
}

impl TransactionEngine {
    #[must_use]
    pub fn new(
        config: MarketplaceConfig,
        currencies: Arc<CurrencyRegistry>,
        book: Arc<DealBook>,
        log: Arc<TransactionLog>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            allocator: IdentifierAllocator::new(config.id_allocation_attempts.max(1)),
            config,
            currencies,
            book,
            log,
            users,
        }
    }

    /// Open a pending transaction against an active deal.
    ///
    /// # Errors
    /// - `InvalidTransaction` if the amount is not positive
    /// - `UnknownUser` / `UserInactive` for a bad fulfiller
    /// - `DealNotFound` if the deal is missing or inactive
    /// - `SelfTrade` if the fulfiller owns the deal
    /// - `ExceedsAvailable` if the amount is more than the deal offers
    pub fn create(&self, request: NewTransaction) -> Result<ExchangeTransaction> {
        check_amount(request.amount)?;
        require_active_user(self.users.as_ref(), request.user)?;

        let result = self.book.with_active_deal(&request.deal, |deal| {
            check_fulfilment(request.user, request.amount, deal)?;
            self.insert_with_fresh_id(&request)
        });
        match &result {
            Ok(tx) => tracing::info!(
                transaction_id = %tx.id,
                deal_id = %tx.deal,
                user = %tx.user,
                amount = %tx.amount,
                "Transaction created"
            ),
            Err(err) => tracing::warn!(
                deal_id = %request.deal,
                user = %request.user,
                error = %err,
                "Transaction rejected"
            ),
        }
        result
    }

    /// Apply a partial update. The deal must still be active and the
    /// resulting transaction must still pass the self-trade and availability
    /// checks. Status may only move forward.
    ///
    /// # Errors
    /// `TransactionNotFound`, `InvalidStatusTransition`, or any error
    /// [`Self::create`] reports.
    pub fn update(&self, id: &TransactionId, update: &TransactionUpdate) -> Result<ExchangeTransaction> {
        if let Some(amount) = update.amount {
            check_amount(amount)?;
        }
        let deal_id = self
            .log
            .get(id)
            .map(|tx| tx.deal)
            .ok_or_else(|| PeerfxError::TransactionNotFound(id.clone()))?;

        let result = self.book.with_active_deal(&deal_id, |deal| {
            self.log.update(id, |tx| {
                if let Some(target) = update.status {
                    if !tx.status.can_transition_to(target) {
                        return Err(PeerfxError::InvalidStatusTransition {
                            from: tx.status,
                            to: target,
                        });
                    }
                }
                update.apply_to(tx);
                check_fulfilment(tx.user, tx.amount, deal)
            })
        });
        match &result {
            Ok(tx) => tracing::info!(transaction_id = %tx.id, status = %tx.status, "Transaction updated"),
            Err(err) => tracing::warn!(transaction_id = %id, error = %err, "Transaction update rejected"),
        }
        result
    }

    /// Mark a pending transaction completed.
    pub fn complete(&self, id: &TransactionId) -> Result<ExchangeTransaction> {
        self.update(id, &TransactionUpdate::complete())
    }

    /// Record the fulfiller's feedback on a transaction.
    pub fn rate(&self, id: &TransactionId, thumbs_up: bool) -> Result<ExchangeTransaction> {
        self.update(id, &TransactionUpdate::rate(thumbs_up))
    }

    /// Remove a transaction. The deal is untouched.
    ///
    /// # Errors
    /// `TransactionNotFound` if no transaction has this id.
    pub fn delete(&self, id: &TransactionId) -> Result<ExchangeTransaction> {
        let tx = self
            .log
            .remove(id)
            .ok_or_else(|| PeerfxError::TransactionNotFound(id.clone()))?;
        tracing::info!(transaction_id = %tx.id, deal_id = %tx.deal, "Transaction deleted");
        Ok(tx)
    }

    /// # Errors
    /// `TransactionNotFound` if no transaction has this id.
    pub fn get(&self, id: &TransactionId) -> Result<ExchangeTransaction> {
        self.log
            .get(id)
            .ok_or_else(|| PeerfxError::TransactionNotFound(id.clone()))
    }

    #[must_use]
    pub fn list_for_deal(&self, deal: &DealId) -> Vec<ExchangeTransaction> {
        self.log.for_deal(deal)
    }

    #[must_use]
    pub fn list_for_user(&self, user: UserId) -> Vec<ExchangeTransaction> {
        self.log.for_user(user)
    }

    /// The currency the fulfiller receives: the deal's fund currency.
    ///
    /// # Errors
    /// `DealNotFound` if the deal is gone, `CurrencyNotFound` if its symbol
    /// is no longer registered.
    pub fn requested_currency(&self, tx: &ExchangeTransaction) -> Result<Currency> {
        let deal = self.deal_of(tx)?;
        self.currencies.lookup(&deal.fund_currency)
    }

    /// The currency the fulfiller pays in: the deal's exchange currency.
    pub fn offered_currency(&self, tx: &ExchangeTransaction) -> Result<Currency> {
        let deal = self.deal_of(tx)?;
        self.currencies.lookup(&deal.exchange_currency)
    }

    fn deal_of(&self, tx: &ExchangeTransaction) -> Result<ExchangeDeal> {
        self.book
            .get(&tx.deal)
            .ok_or_else(|| PeerfxError::DealNotFound(tx.deal.clone()))
    }

    fn insert_with_fresh_id(&self, request: &NewTransaction) -> Result<ExchangeTransaction> {
        let mut last_conflict = None;
        for attempt in 1..=self.config.insert_retry_attempts.max(1) {
            let id = self.allocator.transaction_id(|raw| self.log.contains(raw))?;
            let now = Utc::now();
            let tx = ExchangeTransaction {
                id,
                user: request.user,
                deal: request.deal.clone(),
                amount: request.amount,
                status: TransactionStatus::Pending,
                thumbs_up: None,
                created_at: now,
                updated_at: now,
                sequence: 0,
            };
            match self.log.insert(tx) {
                Err(err @ PeerfxError::DuplicateIdentifier { .. }) => {
                    tracing::debug!(attempt, error = %err, "Transaction id collided at insert, re-allocating");
                    last_conflict = Some(err);
                }
                other => return other,
            }
        }
        Err(last_conflict.unwrap_or_else(|| {
            PeerfxError::Internal("transaction insert retry budget is zero".into())
        }))
    }
}

fn check_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(PeerfxError::InvalidTransaction {
            reason: "amount must be positive".into(),
        });
    }
    Ok(())
}

/// Self-trade and availability checks against the deal.
fn check_fulfilment(user: UserId, amount: Decimal, deal: &ExchangeDeal) -> Result<()> {
    if user == deal.owner {
        return Err(PeerfxError::SelfTrade);
    }
    // An overflowing product exceeds every representable amount.
    match deal.available_in_exchange_currency() {
        Some(available) if amount > available => Err(PeerfxError::ExceedsAvailable {
            available,
            currency: deal.exchange_currency.clone(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use peerfx_types::NewDeal;
    use peerfx_types::directory::test_directory::StaticDirectory;

    use super::*;
    use crate::DealEngine;

    struct Fixture {
        deals: DealEngine,
        engine: TransactionEngine,
        users: Arc<StaticDirectory>,
    }

    fn fixture() -> Fixture {
        let config = MarketplaceConfig::default();
        let users = Arc::new(StaticDirectory::new());
        let currencies = Arc::new(
            CurrencyRegistry::with_currencies([Currency::usd(), Currency::ngn()]).unwrap(),
        );
        let book = Arc::new(DealBook::new());
        let log = Arc::new(TransactionLog::new());
        let deals = DealEngine::new(
            config.clone(),
            currencies.clone(),
            book.clone(),
            log.clone(),
            users.clone(),
        );
        let engine = TransactionEngine::new(config, currencies, book, log, users.clone());
        Fixture {
            deals,
            engine,
            users,
        }
    }

    /// 60 000 USD at 300 NGN/USD: 18 000 000 NGN available.
    fn open_deal(f: &Fixture) -> (UserId, ExchangeDeal) {
        let owner = f.users.add_active();
        let deal = f
            .deals
            .create(NewDeal::dummy(
                owner,
                "USD",
                Decimal::from(60_000),
                "NGN",
                Decimal::from(300),
            ))
            .unwrap();
        (owner, deal)
    }

    fn request(user: UserId, deal: &ExchangeDeal, amount: i64) -> NewTransaction {
        NewTransaction {
            user,
            deal: deal.id.clone(),
            amount: Decimal::from(amount),
        }
    }

    #[test]
    fn availability_boundary() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();

        let tx = f.engine.create(request(buyer, &deal, 18_000_000)).unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.thumbs_up, None);

        match f.engine.create(request(buyer, &deal, 18_000_001)).unwrap_err() {
            PeerfxError::ExceedsAvailable {
                available,
                currency,
            } => {
                assert_eq!(available, Decimal::from(18_000_000));
                assert_eq!(currency, "NGN");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn owner_cannot_fulfil_own_deal() {
        let f = fixture();
        let (owner, deal) = open_deal(&f);
        assert!(matches!(
            f.engine.create(request(owner, &deal, 10)),
            Err(PeerfxError::SelfTrade)
        ));
        assert!(f.engine.list_for_deal(&deal.id).is_empty());
    }

    #[test]
    fn rejects_bad_amount_user_and_deal() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();
        assert!(matches!(
            f.engine.create(request(buyer, &deal, 0)),
            Err(PeerfxError::InvalidTransaction { .. })
        ));
        assert!(matches!(
            f.engine.create(request(UserId::new(), &deal, 10)),
            Err(PeerfxError::UnknownUser(_))
        ));
        let sleeper = f.users.add(false);
        assert!(matches!(
            f.engine.create(request(sleeper, &deal, 10)),
            Err(PeerfxError::UserInactive(_))
        ));

        f.deals.deactivate(&deal.id).unwrap();
        assert!(matches!(
            f.engine.create(request(buyer, &deal, 10)),
            Err(PeerfxError::DealNotFound(_))
        ));
    }

    #[test]
    fn status_moves_forward_only() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();
        let tx = f.engine.create(request(buyer, &deal, 1000)).unwrap();

        let done = f.engine.complete(&tx.id).unwrap();
        assert!(done.is_completed());

        let back = TransactionUpdate {
            status: Some(TransactionStatus::Pending),
            ..TransactionUpdate::default()
        };
        assert!(matches!(
            f.engine.update(&tx.id, &back),
            Err(PeerfxError::InvalidStatusTransition { .. })
        ));

        let rated = f.engine.rate(&tx.id, true).unwrap();
        assert_eq!(rated.thumbs_up, Some(true));
        assert!(rated.is_completed());
    }

    #[test]
    fn update_rechecks_availability() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();
        let tx = f.engine.create(request(buyer, &deal, 1000)).unwrap();

        let too_much = TransactionUpdate {
            amount: Some(Decimal::from(18_000_001)),
            ..TransactionUpdate::default()
        };
        assert!(matches!(
            f.engine.update(&tx.id, &too_much),
            Err(PeerfxError::ExceedsAvailable { .. })
        ));
        assert_eq!(f.engine.get(&tx.id).unwrap().amount, Decimal::from(1000));
    }

    #[test]
    fn update_rechecks_against_live_deal() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();
        let tx = f.engine.create(request(buyer, &deal, 18_000_000)).unwrap();

        let shrink = peerfx_types::DealUpdate {
            fund_amount: Some(Decimal::from(30_000)),
            ..peerfx_types::DealUpdate::default()
        };
        f.deals.update(&deal.id, &shrink).unwrap();
        match f.engine.complete(&tx.id).unwrap_err() {
            PeerfxError::ExceedsAvailable { available, .. } => {
                assert_eq!(available, Decimal::from(9_000_000));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(f.engine.get(&tx.id).unwrap().status, TransactionStatus::Pending);

        // The deal changing hands to the fulfiller turns it into a self-trade.
        f.engine
            .book
            .update_capped(&deal.id, 5, |d| {
                d.owner = buyer;
                d.fund_amount = Decimal::from(60_000);
                Ok(())
            })
            .unwrap();
        assert!(matches!(
            f.engine.rate(&tx.id, true),
            Err(PeerfxError::SelfTrade)
        ));
        assert_eq!(f.engine.get(&tx.id).unwrap().thumbs_up, None);
    }

    #[test]
    fn availability_beyond_decimal_range_admits_any_amount() {
        let f = fixture();
        let owner = f.users.add_active();
        let buyer = f.users.add_active();
        let deal = f
            .deals
            .create(NewDeal::dummy(
                owner,
                "USD",
                Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0),
                "NGN",
                Decimal::from(10_000_000_000_i64),
            ))
            .unwrap();
        assert!(deal.available_in_exchange_currency().is_none());

        let tx = f.engine.create(request(buyer, &deal, 1)).unwrap();
        assert_eq!(tx.amount, Decimal::ONE);
        assert!(f.engine.complete(&tx.id).unwrap().is_completed());
    }

    #[test]
    fn zero_attempt_budgets_still_allocate() {
        let config = MarketplaceConfig {
            id_allocation_attempts: 0,
            insert_retry_attempts: 0,
            ..MarketplaceConfig::default()
        };
        let users = Arc::new(StaticDirectory::new());
        let currencies = Arc::new(
            CurrencyRegistry::with_currencies([Currency::usd(), Currency::ngn()]).unwrap(),
        );
        let book = Arc::new(DealBook::new());
        let log = Arc::new(TransactionLog::new());
        let deals = DealEngine::new(
            config.clone(),
            currencies.clone(),
            book.clone(),
            log.clone(),
            users.clone(),
        );
        let engine = TransactionEngine::new(config, currencies, book, log, users.clone());

        let owner = users.add_active();
        let buyer = users.add_active();
        let deal = deals
            .create(NewDeal::dummy(owner, "USD", Decimal::from(500), "NGN", Decimal::from(455)))
            .unwrap();
        assert!(engine.create(request(buyer, &deal, 1000)).is_ok());
    }

    #[test]
    fn update_requires_active_deal() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();
        let tx = f.engine.create(request(buyer, &deal, 1000)).unwrap();
        f.deals.deactivate(&deal.id).unwrap();
        assert!(matches!(
            f.engine.complete(&tx.id),
            Err(PeerfxError::DealNotFound(_))
        ));
    }

    #[test]
    fn currency_views_follow_the_deal() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();
        let tx = f.engine.create(request(buyer, &deal, 1000)).unwrap();
        assert_eq!(f.engine.requested_currency(&tx).unwrap().symbol, "USD");
        assert_eq!(f.engine.offered_currency(&tx).unwrap().symbol, "NGN");
    }

    #[test]
    fn delete_leaves_deal_and_deal_delete_cascades() {
        let f = fixture();
        let (_, deal) = open_deal(&f);
        let buyer = f.users.add_active();
        let first = f.engine.create(request(buyer, &deal, 1000)).unwrap();
        f.engine.create(request(buyer, &deal, 2000)).unwrap();

        f.engine.delete(&first.id).unwrap();
        assert!(f.deals.get(&deal.id).is_ok());
        assert!(matches!(
            f.engine.delete(&first.id),
            Err(PeerfxError::TransactionNotFound(_))
        ));
        assert_eq!(f.engine.list_for_user(buyer).len(), 1);

        let (_, dropped) = f.deals.delete(&deal.id).unwrap();
        assert_eq!(dropped, 1);
        assert!(f.engine.list_for_user(buyer).is_empty());
    }
}
