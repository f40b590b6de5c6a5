//! # peerfx-exchange
//!
//! **Marketplace plane**: currency lookup, deal lifecycle, and fulfilment
//! transactions, with every business invariant checked before a record is
//! persisted.
//!
//! ## Architecture
//!
//! 1. **CurrencyRegistry**: symbol → value-per-reference-unit lookup
//! 2. **DealBook**: deal storage; "count active deals, then insert" and the
//!    identifier uniqueness check run under one write lock
//! 3. **DealEngine**: minimum trade value, per-user active-deal cap, lifecycle
//! 4. **TransactionLog**: transaction storage with identifier uniqueness
//! 5. **TransactionEngine**: self-trade and over-fulfilment prevention
//! 6. **Marketplace**: wires the above around one config and user directory
//!
//! ## Request Flow
//!
//! ```text
//! API → AccessPolicy (caller) → DealEngine.create() → CurrencyRegistry.lookup()
//!     → DealBook.insert_capped() → ExchangeDeal
//!
//! API → AccessPolicy (caller) → TransactionEngine.create()
//!     → DealBook.with_active_deal() → TransactionLog.insert() → ExchangeTransaction
//! ```
//!
//! Lock order is always deal book, then transaction log.

pub mod currency_registry;
pub mod deal_book;
pub mod deal_engine;
pub mod marketplace;
pub mod transaction_engine;
pub mod transaction_log;

pub use currency_registry::CurrencyRegistry;
pub use deal_book::DealBook;
pub use deal_engine::DealEngine;
pub use marketplace::Marketplace;
pub use transaction_engine::TransactionEngine;
pub use transaction_log::TransactionLog;
