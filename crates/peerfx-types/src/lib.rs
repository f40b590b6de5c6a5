//! # peerfx-types
//!
//! Shared types, errors, and configuration for the **PeerFX** exchange
//! marketplace.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`ShortId`], [`DealId`], [`TransactionId`], [`Username`]
//! - **Identifier allocation**: [`IdentifierAllocator`], [`IdentifierKind`]
//! - **Trust model**: [`ConfirmationFlags`], [`TrustLevel`], [`StageProgress`]
//! - **User model**: [`User`], [`Profile`], [`Gender`]
//! - **Currency model**: [`Currency`]
//! - **Deal model**: [`ExchangeDeal`], [`BankDetails`], [`DealUpdate`], [`DealFilter`]
//! - **Transaction model**: [`ExchangeTransaction`], [`TransactionStatus`], [`TransactionUpdate`]
//! - **Configuration**: [`MarketplaceConfig`], [`IdentityConfig`]
//! - **Directory seam**: [`UserDirectory`], [`UserSnapshot`]
//! - **Errors**: [`PeerfxError`] with `PFX_ERR_` prefix codes and [`ErrorKind`]
//! - **Constants**: marketplace-wide limits and defaults

pub mod allocator;
pub mod config;
pub mod constants;
pub mod currency;
pub mod deal;
pub mod directory;
pub mod error;
pub mod ids;
pub mod transaction;
pub mod trust;
pub mod user;

// Re-export all primary types at crate root for ergonomic imports:
//   use peerfx_types::{ExchangeDeal, DealId, PeerfxError, ...};

pub use allocator::*;
pub use config::*;
pub use currency::*;
pub use deal::*;
pub use directory::*;
pub use error::*;
pub use ids::*;
pub use transaction::*;
pub use trust::*;
pub use user::*;

// Constants are accessed via `peerfx_types::constants::FOO`
// (not re-exported to avoid name collisions).
