//! Exchange transaction types.
//!
//! A transaction is a fulfiller's response to someone else's deal: the
//! fulfiller provides `amount` of the deal's exchange currency.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  complete   ┌───────────┐
//!   │ PENDING ├────────────▶│ COMPLETED │
//!   └─────────┘             └───────────┘
//! ```
//!
//! `COMPLETED` is terminal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{DealId, TransactionId, UserId};

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
}

impl TransactionStatus {
    /// Can a transaction move from this status to `target`?
    ///
    /// Staying in the same status is always allowed.
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        *self == target || matches!((self, target), (Self::Pending, Self::Completed))
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// A fulfilment of an [`crate::ExchangeDeal`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeTransaction {
    pub id: TransactionId,
    /// The fulfiller.
    pub user: UserId,
    pub deal: DealId,
    /// Quantity of the deal's exchange currency the fulfiller provides.
    pub amount: Decimal,
    pub status: TransactionStatus,
    /// `None` until the fulfiller rates the exchange.
    pub thumbs_up: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store-assigned insertion sequence, breaks creation-time ties.
    pub sequence: u64,
}

impl ExchangeTransaction {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Creation order key.
    #[must_use]
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }
}

/// Request to create a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub user: UserId,
    pub deal: DealId,
    pub amount: Decimal,
}

/// Partial update of a transaction. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub amount: Option<Decimal>,
    pub status: Option<TransactionStatus>,
    /// `Some(None)` clears the rating.
    pub thumbs_up: Option<Option<bool>>,
}

impl TransactionUpdate {
    #[must_use]
    pub fn complete() -> Self {
        Self {
            status: Some(TransactionStatus::Completed),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn rate(thumbs_up: bool) -> Self {
        Self {
            thumbs_up: Some(Some(thumbs_up)),
            ..Self::default()
        }
    }

    /// Apply the mutations to `tx` in place. The caller checks the status
    /// transition first.
    pub fn apply_to(&self, tx: &mut ExchangeTransaction) {
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(status) = self.status {
            tx.status = status;
        }
        if let Some(thumbs_up) = self.thumbs_up {
            tx.thumbs_up = thumbs_up;
        }
    }
}
