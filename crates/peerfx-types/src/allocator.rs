//! Short identifier allocation for deals, transactions, and usernames.
//!
//! Identifiers are drawn at random and re-drawn while the caller reports a
//! collision against the target entity's existing identifier set. The loop is
//! bounded: after `attempts` draws the allocator gives up with
//! [`PeerfxError::AllocationExhausted`].
//!
//! Allocation alone is not atomic with the subsequent insert. Stores enforce
//! uniqueness on insert and report [`PeerfxError::DuplicateIdentifier`], upon
//! which the engine allocates again.

use std::fmt;

use rand::{Rng, distributions::Alphanumeric, seq::index};
use serde::{Deserialize, Serialize};

use crate::{DealId, PeerfxError, Result, ShortId, TransactionId, Username, constants};

/// The entity an identifier is being allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    Deal,
    Transaction,
    Username,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deal => write!(f, "DEAL"),
            Self::Transaction => write!(f, "TRANSACTION"),
            Self::Username => write!(f, "USERNAME"),
        }
    }
}

/// Bounded collision-retry identifier generator.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierAllocator {
    attempts: usize,
}

impl IdentifierAllocator {
    /// Create an allocator that draws at most `attempts` candidates.
    ///
    /// # Panics
    /// Panics if `attempts` is zero.
    #[must_use]
    pub fn new(attempts: usize) -> Self {
        assert!(attempts > 0, "IdentifierAllocator attempts must be > 0");
        Self { attempts }
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Allocate an identifier of `kind` using the thread-local RNG.
    pub fn allocate<F>(&self, kind: IdentifierKind, is_taken: F) -> Result<String>
    where
        F: Fn(&str) -> bool,
    {
        self.allocate_with(&mut rand::thread_rng(), kind, is_taken)
    }

    /// Allocate an identifier of `kind` drawing from `rng`.
    pub fn allocate_with<R, F>(&self, rng: &mut R, kind: IdentifierKind, is_taken: F) -> Result<String>
    where
        R: Rng + ?Sized,
        F: Fn(&str) -> bool,
    {
        for _ in 0..self.attempts {
            let candidate = draw(rng, kind);
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
        }
        Err(PeerfxError::AllocationExhausted {
            kind,
            attempts: self.attempts,
        })
    }

    /// Allocate a fresh [`DealId`].
    pub fn deal_id<F>(&self, is_taken: F) -> Result<DealId>
    where
        F: Fn(&str) -> bool,
    {
        self.allocate(IdentifierKind::Deal, is_taken)
            .map(|raw| DealId(ShortId::from_generated(raw)))
    }

    /// Allocate a fresh [`TransactionId`].
    pub fn transaction_id<F>(&self, is_taken: F) -> Result<TransactionId>
    where
        F: Fn(&str) -> bool,
    {
        self.allocate(IdentifierKind::Transaction, is_taken)
            .map(|raw| TransactionId(ShortId::from_generated(raw)))
    }

    /// Allocate a fresh profile [`Username`].
    pub fn username<F>(&self, is_taken: F) -> Result<Username>
    where
        F: Fn(&str) -> bool,
    {
        self.allocate(IdentifierKind::Username, is_taken).map(Username)
    }
}

impl Default for IdentifierAllocator {
    fn default() -> Self {
        Self::new(constants::DEFAULT_ID_ALLOCATION_ATTEMPTS)
    }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, kind: IdentifierKind) -> String {
    match kind {
        IdentifierKind::Deal | IdentifierKind::Transaction => (0..constants::SHORT_ID_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect(),
        IdentifierKind::Username => {
            // Digits are sampled without replacement.
            let mut name = String::with_capacity(
                constants::USERNAME_PREFIX.len() + constants::USERNAME_DIGITS,
            );
            name.push_str(constants::USERNAME_PREFIX);
            for digit in index::sample(rng, 10, constants::USERNAME_DIGITS) {
                name.push(char::from(b'0' + u8::try_from(digit).unwrap_or(0)));
            }
            name
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn deal_ids_are_ten_alphanumerics() {
        let alloc = IdentifierAllocator::default();
        for _ in 0..100 {
            let id = alloc.deal_id(|_| false).unwrap();
            assert!(ShortId::is_well_formed(id.as_str()), "bad id {id}");
        }
    }

    #[test]
    fn usernames_have_prefix_and_distinct_digits() {
        let alloc = IdentifierAllocator::default();
        let name = alloc.username(|_| false).unwrap();
        let digits = name.as_str().strip_prefix("user").unwrap();
        assert_eq!(digits.len(), 5);
        assert!(digits.bytes().all(|b| b.is_ascii_digit()));
        let unique: HashSet<u8> = digits.bytes().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn collision_redraws_until_free() {
        let alloc = IdentifierAllocator::new(20);
        let mut rng = StdRng::seed_from_u64(7);
        let first = alloc
            .allocate_with(&mut rng, IdentifierKind::Deal, |_| false)
            .unwrap();

        // Replay the same stream but report the first draw as taken.
        let mut rng = StdRng::seed_from_u64(7);
        let second = alloc
            .allocate_with(&mut rng, IdentifierKind::Deal, |c| c == first)
            .unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn exhaustion_is_bounded() {
        let alloc = IdentifierAllocator::new(4);
        let calls = std::cell::Cell::new(0);
        let err = alloc
            .allocate(IdentifierKind::Transaction, |_| {
                calls.set(calls.get() + 1);
                true
            })
            .unwrap_err();
        assert_eq!(calls.get(), 4);
        assert!(matches!(
            err,
            PeerfxError::AllocationExhausted {
                kind: IdentifierKind::Transaction,
                attempts: 4
            }
        ));
    }

    #[test]
    fn seeded_allocation_is_deterministic() {
        let alloc = IdentifierAllocator::default();
        let a = alloc
            .allocate_with(&mut StdRng::seed_from_u64(42), IdentifierKind::Username, |_| false)
            .unwrap();
        let b = alloc
            .allocate_with(&mut StdRng::seed_from_u64(42), IdentifierKind::Username, |_| false)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "attempts must be > 0")]
    fn zero_attempts_rejected() {
        let _ = IdentifierAllocator::new(0);
    }
}
