//! # peerfx-identity
//!
//! **Identity subsystem**: user registration, confirmation flows, derived
//! trust levels, and the access policy callers evaluate before invoking
//! mutating marketplace operations.
//!
//! ## Architecture
//!
//! 1. **UserRegistry**: owns `User` and `Profile` records. Creates both in a
//!    single composite operation and recomputes the trust level immediately
//!    before every write.
//! 2. **ApiKeyRegistry**: issues hashed project API keys and verifies them.
//! 3. **StaffPolicy**: the [`AccessPolicy`] predicate over an [`Actor`],
//!    an [`Operation`] and the target's owner.
//!
//! ## Request Flow
//!
//! ```text
//! API → ApiKeyRegistry.verify() / UserRegistry.get() → Actor
//!     → StaffPolicy.authorize() → marketplace engine
//! ```
//!
//! The registry implements [`peerfx_types::UserDirectory`], which is the only
//! view of identity the marketplace engines get.

pub mod access;
pub mod phone;
pub mod registry;

pub use access::{AccessPolicy, Actor, ApiKeyRegistry, Operation, Project, StaffPolicy};
pub use registry::UserRegistry;
