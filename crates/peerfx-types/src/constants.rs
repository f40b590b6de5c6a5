//! Marketplace-wide constants for PeerFX.

/// Length of deal and transaction identifiers.
pub const SHORT_ID_LEN: usize = 10;

/// Prefix of generated profile usernames.
pub const USERNAME_PREFIX: &str = "user";

/// Number of distinct digits following [`USERNAME_PREFIX`].
pub const USERNAME_DIGITS: usize = 5;

/// Default minimum trade value, in reference units (one USD-equivalent).
pub const DEFAULT_MINIMUM_TRADE_VALUE: i64 = 100;

/// Default maximum number of active deals a single user may hold.
pub const DEFAULT_MAX_ACTIVE_DEALS: usize = 5;

/// Default number of identifier draws before allocation gives up.
pub const DEFAULT_ID_ALLOCATION_ATTEMPTS: usize = 20;

/// Default number of times a create is retried after the store reports a
/// duplicate identifier.
pub const DEFAULT_INSERT_RETRY_ATTEMPTS: usize = 3;

/// Maximum length of a currency symbol.
pub const MAX_CURRENCY_SYMBOL_LEN: usize = 10;

/// Maximum length of a currency display name.
pub const MAX_CURRENCY_NAME_LEN: usize = 64;

/// Maximum length of bank account name and bank name on a deal.
pub const MAX_BANK_FIELD_LEN: usize = 25;

/// Maximum length of a user's first or last name.
pub const MAX_NAME_LEN: usize = 15;

/// Minimum number of digits in a phone number (after the leading `+`).
pub const MIN_PHONE_DIGITS: usize = 7;

/// Maximum number of digits in a phone number (after the leading `+`).
pub const MAX_PHONE_DIGITS: usize = 15;

/// Length of the public prefix of an issued API key.
pub const API_KEY_PREFIX_LEN: usize = 8;

/// Length of the secret part of an issued API key.
pub const API_KEY_SECRET_LEN: usize = 32;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service name.
pub const SERVICE_NAME: &str = "PeerFX";
