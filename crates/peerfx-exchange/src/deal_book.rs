//! In-memory deal storage.
//!
//! Every check-then-write sequence (identifier uniqueness, per-owner active
//! count) runs under a single write lock, so concurrent creations for the
//! same owner can never exceed the cap between the count and the insert.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use peerfx_types::{
    DealFilter, DealId, ExchangeDeal, IdentifierKind, PeerfxError, Result, UserId,
};

/// Thread-safe deal store keyed by [`DealId`].
pub struct DealBook {
    deals: RwLock<HashMap<DealId, ExchangeDeal>>,
    sequence: AtomicU64,
}

impl DealBook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            deals: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Whether an identifier is already in use. Used as the allocator's
    /// `is_taken` probe.
    #[must_use]
    pub fn contains(&self, raw_id: &str) -> bool {
        DealId::parse(raw_id).is_some_and(|id| self.deals.read().contains_key(&id))
    }

    #[must_use]
    pub fn get(&self, id: &DealId) -> Option<ExchangeDeal> {
        self.deals.read().get(id).cloned()
    }

    /// Active deals owned by `owner`, not counting `excluding`.
    #[must_use]
    pub fn active_count(&self, owner: UserId, excluding: Option<&DealId>) -> usize {
        count_active(&self.deals.read(), owner, excluding)
    }

    /// Insert a new deal.
    ///
    /// Stamps `created_at`, `updated_at` and `sequence`. If the deal is
    /// active, the owner's active count is checked against `max_active`
    /// under the same lock as the insert.
    ///
    /// # Errors
    /// - `DuplicateIdentifier` if the id is already stored
    /// - `DealLimitExceeded` if the owner is at the cap
    pub fn insert_capped(&self, mut deal: ExchangeDeal, max_active: usize) -> Result<ExchangeDeal> {
        let mut deals = self.deals.write();
        if deals.contains_key(&deal.id) {
            return Err(PeerfxError::DuplicateIdentifier {
                kind: IdentifierKind::Deal,
                id: deal.id.to_string(),
            });
        }
        if deal.active && count_active(&deals, deal.owner, None) >= max_active {
            return Err(PeerfxError::DealLimitExceeded { limit: max_active });
        }

        let now = Utc::now();
        deal.created_at = now;
        deal.updated_at = now;
        deal.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        deals.insert(deal.id.clone(), deal.clone());
        Ok(deal)
    }

    /// Mutate a stored deal.
    ///
    /// `mutate` runs against a copy; the copy replaces the stored deal only
    /// if `mutate` succeeds and, when the result is active, the owner's other
    /// active deals are below `max_active`.
    ///
    /// # Errors
    /// - `DealNotFound` if no deal has this id
    /// - whatever `mutate` returns
    /// - `DealLimitExceeded` if the update would push the owner over the cap
    pub fn update_capped<F>(&self, id: &DealId, max_active: usize, mutate: F) -> Result<ExchangeDeal>
    where
        F: FnOnce(&mut ExchangeDeal) -> Result<()>,
    {
        let mut deals = self.deals.write();
        let mut updated = deals
            .get(id)
            .cloned()
            .ok_or_else(|| PeerfxError::DealNotFound(id.clone()))?;
        mutate(&mut updated)?;

        if updated.active && count_active(&deals, updated.owner, Some(id)) >= max_active {
            return Err(PeerfxError::DealLimitExceeded { limit: max_active });
        }

        updated.updated_at = Utc::now();
        deals.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    /// Run `f` against an active deal while holding the read lock, so the
    /// deal cannot change or disappear until `f` returns.
    ///
    /// # Errors
    /// `DealNotFound` if the deal is missing or inactive; otherwise whatever
    /// `f` returns.
    pub fn with_active_deal<F, T>(&self, id: &DealId, f: F) -> Result<T>
    where
        F: FnOnce(&ExchangeDeal) -> Result<T>,
    {
        let deals = self.deals.read();
        match deals.get(id) {
            Some(deal) if deal.active => f(deal),
            _ => Err(PeerfxError::DealNotFound(id.clone())),
        }
    }

    /// Remove a deal, running `on_removed` under the write lock.
    ///
    /// # Errors
    /// `DealNotFound` if no deal has this id.
    pub fn remove_with<F, T>(&self, id: &DealId, on_removed: F) -> Result<(ExchangeDeal, T)>
    where
        F: FnOnce(&ExchangeDeal) -> T,
    {
        let mut deals = self.deals.write();
        let deal = deals
            .remove(id)
            .ok_or_else(|| PeerfxError::DealNotFound(id.clone()))?;
        let extra = on_removed(&deal);
        Ok((deal, extra))
    }

    /// Active deals passing `filter`, in creation order.
    #[must_use]
    pub fn list_active(&self, filter: &DealFilter) -> Vec<ExchangeDeal> {
        let mut out: Vec<ExchangeDeal> = self
            .deals
            .read()
            .values()
            .filter(|d| d.active && filter.matches(d))
            .cloned()
            .collect();
        out.sort_by_key(ExchangeDeal::order_key);
        out
    }

    /// All deals (active or not) owned by `owner`, in creation order.
    #[must_use]
    pub fn for_owner(&self, owner: UserId) -> Vec<ExchangeDeal> {
        let mut out: Vec<ExchangeDeal> = self
            .deals
            .read()
            .values()
            .filter(|d| d.owner == owner)
            .cloned()
            .collect();
        out.sort_by_key(ExchangeDeal::order_key);
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deals.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DealBook {
    fn default() -> Self {
        Self::new()
    }
}

fn count_active(
    deals: &HashMap<DealId, ExchangeDeal>,
    owner: UserId,
    excluding: Option<&DealId>,
) -> usize {
    deals
        .values()
        .filter(|d| d.owner == owner && d.active && Some(&d.id) != excluding)
        .count()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn deal(owner: UserId, id: &'static str) -> ExchangeDeal {
        let mut d = ExchangeDeal::dummy(owner, Decimal::new(1000, 0), Decimal::new(455, 0));
        d.id = DealId::from_static(id);
        d
    }

    #[test]
    fn insert_assigns_increasing_sequence() {
        let book = DealBook::new();
        let owner = UserId::new();
        let a = book.insert_capped(deal(owner, "AAAAAAAAAA"), 5).unwrap();
        let b = book.insert_capped(deal(owner, "BBBBBBBBBB"), 5).unwrap();
        assert!(a.sequence < b.sequence);
        assert!(book.contains("AAAAAAAAAA"));
        assert!(!book.contains("CCCCCCCCCC"));
        assert!(!book.contains("bad id"));
    }

    #[test]
    fn duplicate_id_rejected() {
        let book = DealBook::new();
        let owner = UserId::new();
        book.insert_capped(deal(owner, "AAAAAAAAAA"), 5).unwrap();
        let err = book.insert_capped(deal(owner, "AAAAAAAAAA"), 5).unwrap_err();
        assert!(matches!(err, PeerfxError::DuplicateIdentifier { .. }));
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn cap_counts_only_active_deals_of_owner() {
        let book = DealBook::new();
        let owner = UserId::new();
        let other = UserId::new();
        book.insert_capped(deal(owner, "AAAAAAAAAA"), 2).unwrap();
        book.insert_capped(deal(other, "OOOOOOOOOO"), 2).unwrap();
        let mut inactive = deal(owner, "IIIIIIIIII");
        inactive.active = false;
        book.insert_capped(inactive, 2).unwrap();
        book.insert_capped(deal(owner, "BBBBBBBBBB"), 2).unwrap();

        let err = book.insert_capped(deal(owner, "CCCCCCCCCC"), 2).unwrap_err();
        assert!(matches!(err, PeerfxError::DealLimitExceeded { limit: 2 }));
        assert_eq!(book.active_count(owner, None), 2);

        // An inactive deal can still be stored at the cap.
        let mut parked = deal(owner, "PPPPPPPPPP");
        parked.active = false;
        assert!(book.insert_capped(parked, 2).is_ok());
    }

    #[test]
    fn update_excludes_self_from_cap() {
        let book = DealBook::new();
        let owner = UserId::new();
        let a = book.insert_capped(deal(owner, "AAAAAAAAAA"), 1).unwrap();
        let updated = book
            .update_capped(&a.id, 1, |d| {
                d.fund_amount = Decimal::new(2000, 0);
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.fund_amount, Decimal::new(2000, 0));
    }

    #[test]
    fn failed_mutation_leaves_deal_untouched() {
        let book = DealBook::new();
        let owner = UserId::new();
        let a = book.insert_capped(deal(owner, "AAAAAAAAAA"), 5).unwrap();
        let err = book
            .update_capped(&a.id, 5, |d| {
                d.fund_amount = Decimal::ZERO;
                Err(PeerfxError::InvalidDeal {
                    reason: "zero".into(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, PeerfxError::InvalidDeal { .. }));
        assert_eq!(book.get(&a.id).unwrap().fund_amount, Decimal::new(1000, 0));
    }

    #[test]
    fn reactivation_blocked_at_cap() {
        let book = DealBook::new();
        let owner = UserId::new();
        let mut parked = deal(owner, "PPPPPPPPPP");
        parked.active = false;
        let parked = book.insert_capped(parked, 1).unwrap();
        book.insert_capped(deal(owner, "AAAAAAAAAA"), 1).unwrap();

        let err = book
            .update_capped(&parked.id, 1, |d| {
                d.active = true;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, PeerfxError::DealLimitExceeded { .. }));
        assert!(!book.get(&parked.id).unwrap().active);
    }

    #[test]
    fn with_active_deal_hides_inactive() {
        let book = DealBook::new();
        let owner = UserId::new();
        let mut parked = deal(owner, "PPPPPPPPPP");
        parked.active = false;
        let parked = book.insert_capped(parked, 5).unwrap();
        let err = book.with_active_deal(&parked.id, |_| Ok(())).unwrap_err();
        assert!(matches!(err, PeerfxError::DealNotFound(_)));
    }

    #[test]
    fn listing_is_in_creation_order_and_skips_inactive() {
        let book = DealBook::new();
        let owner = UserId::new();
        book.insert_capped(deal(owner, "AAAAAAAAAA"), 5).unwrap();
        let mut parked = deal(owner, "PPPPPPPPPP");
        parked.active = false;
        book.insert_capped(parked, 5).unwrap();
        book.insert_capped(deal(owner, "BBBBBBBBBB"), 5).unwrap();

        let ids: Vec<String> = book
            .list_active(&DealFilter::default())
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["AAAAAAAAAA", "BBBBBBBBBB"]);
        assert_eq!(book.for_owner(owner).len(), 3);
    }

    #[test]
    fn remove_runs_hook_under_lock() {
        let book = DealBook::new();
        let owner = UserId::new();
        let a = book.insert_capped(deal(owner, "AAAAAAAAAA"), 5).unwrap();
        let (removed, seen) = book.remove_with(&a.id, |d| d.id.clone()).unwrap();
        assert_eq!(removed.id, seen);
        assert!(book.is_empty());
        assert!(matches!(
            book.remove_with(&a.id, |_| ()),
            Err(PeerfxError::DealNotFound(_))
        ));
    }
}
