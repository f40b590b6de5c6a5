//! Error types for the PeerFX marketplace.
//!
//! All errors use the `PFX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Identity errors
//! - 2xx: Currency errors
//! - 3xx: Deal errors
//! - 4xx: Transaction errors
//! - 5xx: Identifier allocation / persistence conflicts
//! - 6xx: Access errors
//! - 9xx: General / internal errors
//!
//! Independently of the code, every error is classified by *cause* through
//! [`PeerfxError::kind`]. Only [`ErrorKind::ConflictRetryable`] may be
//! retried by the engines before it is surfaced.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{DealId, IdentifierKind, TransactionId, TransactionStatus, UserId};

/// Cause-based classification of a [`PeerfxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced entity is absent or not visible to this operation.
    NotFound,
    /// A business rule rejected the request.
    InvariantViolation,
    /// Identifier collision or concurrent race at the persistence boundary.
    ConflictRetryable,
    /// The request references reference data (currency, user) that does not exist.
    Configuration,
    /// The actor may not perform the operation.
    Unauthorized,
    /// Unrecoverable internal failure.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::InvariantViolation => write!(f, "INVARIANT_VIOLATION"),
            Self::ConflictRetryable => write!(f, "CONFLICT_RETRYABLE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Central error enum for all PeerFX operations.
#[derive(Debug, Error)]
pub enum PeerfxError {
    // =================================================================
    // Identity Errors (1xx)
    // =================================================================
    /// No user record with this ID exists in the registry.
    #[error("PFX_ERR_100: User not found: {0}")]
    UserNotFound(UserId),

    /// A deal or transaction references a user the directory does not know.
    #[error("PFX_ERR_101: Unknown user referenced: {0}")]
    UnknownUser(UserId),

    /// The user exists but is not active.
    #[error("PFX_ERR_102: User is not active: {0}")]
    UserInactive(UserId),

    /// A user field is missing or malformed.
    #[error("PFX_ERR_103: Invalid user field `{field}`: {reason}")]
    InvalidUser { field: &'static str, reason: String },

    /// Another user already registered this e-mail address.
    #[error("PFX_ERR_104: E-mail already registered: {0}")]
    EmailTaken(String),

    /// Another user already uses this phone number.
    #[error("PFX_ERR_105: This phone number has been used: {0}")]
    PhoneTaken(String),

    /// The phone number does not have the `+<digits>` shape.
    #[error("PFX_ERR_106: Invalid phone number provided: {0}")]
    InvalidPhone(String),

    /// Phone confirmation was requested for a user without a phone number.
    #[error("PFX_ERR_107: Phone number required before confirmation")]
    PhoneRequired,

    // =================================================================
    // Currency Errors (2xx)
    // =================================================================
    /// No currency registered under this symbol.
    #[error("PFX_ERR_200: Currency not found: {0}")]
    CurrencyNotFound(String),

    /// The currency definition is malformed.
    #[error("PFX_ERR_201: Invalid currency: {reason}")]
    InvalidCurrency { reason: String },

    /// A currency with this symbol is already registered.
    #[error("PFX_ERR_202: Currency already registered: {0}")]
    DuplicateCurrency(String),

    // =================================================================
    // Deal Errors (3xx)
    // =================================================================
    /// The requested deal does not exist (or is inactive, where that matters).
    #[error("PFX_ERR_300: Deal not found: {0}")]
    DealNotFound(DealId),

    /// The deal request failed basic validation.
    #[error("PFX_ERR_301: Invalid deal: {reason}")]
    InvalidDeal { reason: String },

    /// The offered amount is worth less than the minimum trade value.
    #[error(
        "PFX_ERR_302: Exchange amount is too small, should not be less than {minimum} {currency}"
    )]
    BelowMinimumTrade { minimum: Decimal, currency: String },

    /// The owner already holds the maximum number of active deals.
    #[error("PFX_ERR_303: You can only have {limit} active deals at a time")]
    DealLimitExceeded { limit: usize },

    // =================================================================
    // Transaction Errors (4xx)
    // =================================================================
    /// The requested transaction does not exist.
    #[error("PFX_ERR_400: Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// The transaction request failed basic validation.
    #[error("PFX_ERR_401: Invalid transaction: {reason}")]
    InvalidTransaction { reason: String },

    /// The fulfiller owns the deal.
    #[error("PFX_ERR_402: Self-trade prevented: you can't buy from your own deal")]
    SelfTrade,

    /// The requested amount exceeds what the deal offers.
    #[error("PFX_ERR_403: Exchanger doesn't have up to the requested amount: available {available} {currency}")]
    ExceedsAvailable { available: Decimal, currency: String },

    /// The status change is not allowed by the transaction lifecycle.
    #[error("PFX_ERR_404: Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    // =================================================================
    // Identifier / Persistence Conflicts (5xx)
    // =================================================================
    /// The store already holds an entity with this identifier.
    #[error("PFX_ERR_500: Duplicate {kind} identifier: {id}")]
    DuplicateIdentifier { kind: IdentifierKind, id: String },

    /// No free identifier was found within the attempt budget.
    #[error("PFX_ERR_501: {kind} identifier allocation exhausted after {attempts} attempts")]
    AllocationExhausted { kind: IdentifierKind, attempts: usize },

    // =================================================================
    // Access Errors (6xx)
    // =================================================================
    /// The actor is not allowed to perform this operation.
    #[error("PFX_ERR_600: Not authorized to {operation}")]
    Unauthorized { operation: String },

    /// The API key is malformed, unknown, revoked, or belongs to an inactive project.
    #[error("PFX_ERR_601: Invalid API key")]
    InvalidApiKey,

    /// A project with this name already exists.
    #[error("PFX_ERR_602: Project already exists: {0}")]
    DuplicateProject(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("PFX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("PFX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config document, out-of-range values).
    #[error("PFX_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl PeerfxError {
    /// Classify this error by cause.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::DealNotFound(_) | Self::TransactionNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::UnknownUser(_) | Self::CurrencyNotFound(_) | Self::Configuration(_) => {
                ErrorKind::Configuration
            }
            Self::UserInactive(_)
            | Self::InvalidUser { .. }
            | Self::EmailTaken(_)
            | Self::PhoneTaken(_)
            | Self::InvalidPhone(_)
            | Self::PhoneRequired
            | Self::InvalidCurrency { .. }
            | Self::DuplicateCurrency(_)
            | Self::InvalidDeal { .. }
            | Self::BelowMinimumTrade { .. }
            | Self::DealLimitExceeded { .. }
            | Self::InvalidTransaction { .. }
            | Self::SelfTrade
            | Self::ExceedsAvailable { .. }
            | Self::InvalidStatusTransition { .. }
            | Self::DuplicateProject(_) => ErrorKind::InvariantViolation,
            Self::DuplicateIdentifier { .. } | Self::AllocationExhausted { .. } => {
                ErrorKind::ConflictRetryable
            }
            Self::Unauthorized { .. } | Self::InvalidApiKey => ErrorKind::Unauthorized,
            Self::Internal(_) | Self::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Whether the whole operation may be retried (re-allocate / re-check).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConflictRetryable
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PeerfxError>;

impl From<serde_json::Error> for PeerfxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
