//! In-memory transaction storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use peerfx_types::{
    DealId, ExchangeTransaction, IdentifierKind, PeerfxError, Result, TransactionId, UserId,
};

/// Thread-safe transaction store keyed by [`TransactionId`].
pub struct TransactionLog {
    transactions: RwLock<HashMap<TransactionId, ExchangeTransaction>>,
    sequence: AtomicU64,
}

impl TransactionLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            transactions: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Allocator `is_taken` probe.
    #[must_use]
    pub fn contains(&self, raw_id: &str) -> bool {
        TransactionId::parse(raw_id).is_some_and(|id| self.transactions.read().contains_key(&id))
    }

    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<ExchangeTransaction> {
        self.transactions.read().get(id).cloned()
    }

    /// Store a new transaction, stamping timestamps and sequence.
    ///
    /// # Errors
    /// `DuplicateIdentifier` if the id is already stored.
    pub fn insert(&self, mut tx: ExchangeTransaction) -> Result<ExchangeTransaction> {
        let mut transactions = self.transactions.write();
        if transactions.contains_key(&tx.id) {
            return Err(PeerfxError::DuplicateIdentifier {
                kind: IdentifierKind::Transaction,
                id: tx.id.to_string(),
            });
        }
        let now = Utc::now();
        tx.created_at = now;
        tx.updated_at = now;
        tx.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        transactions.insert(tx.id.clone(), tx.clone());
        Ok(tx)
    }

    /// Mutate a copy of a stored transaction; the copy is committed only if
    /// `mutate` succeeds.
    ///
    /// # Errors
    /// `TransactionNotFound`, or whatever `mutate` returns.
    pub fn update<F>(&self, id: &TransactionId, mutate: F) -> Result<ExchangeTransaction>
    where
        F: FnOnce(&mut ExchangeTransaction) -> Result<()>,
    {
        let mut transactions = self.transactions.write();
        let mut updated = transactions
            .get(id)
            .cloned()
            .ok_or_else(|| PeerfxError::TransactionNotFound(id.clone()))?;
        mutate(&mut updated)?;
        updated.updated_at = Utc::now();
        transactions.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    #[must_use]
    pub fn remove(&self, id: &TransactionId) -> Option<ExchangeTransaction> {
        self.transactions.write().remove(id)
    }

    /// Drop every transaction against `deal`. Returns how many were removed.
    pub fn remove_for_deal(&self, deal: &DealId) -> usize {
        let mut transactions = self.transactions.write();
        let before = transactions.len();
        transactions.retain(|_, tx| &tx.deal != deal);
        before - transactions.len()
    }

    /// Transactions against `deal`, in creation order.
    #[must_use]
    pub fn for_deal(&self, deal: &DealId) -> Vec<ExchangeTransaction> {
        self.collect(|tx| &tx.deal == deal)
    }

    /// Transactions made by `user`, in creation order.
    #[must_use]
    pub fn for_user(&self, user: UserId) -> Vec<ExchangeTransaction> {
        self.collect(|tx| tx.user == user)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect(&self, keep: impl Fn(&ExchangeTransaction) -> bool) -> Vec<ExchangeTransaction> {
        let mut out: Vec<ExchangeTransaction> = self
            .transactions
            .read()
            .values()
            .filter(|tx| keep(tx))
            .cloned()
            .collect();
        out.sort_by_key(ExchangeTransaction::order_key);
        out
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}
