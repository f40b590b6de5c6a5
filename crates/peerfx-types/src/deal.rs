//! Exchange deal types.
//!
//! A deal is a standing offer: the owner holds `fund_amount` of
//! `fund_currency` and wants `exchange_currency` in return at
//! `exchange_rate` units of exchange currency per unit of fund currency.
//!
//! ## Lifecycle
//!
//! ```text
//!   create ──▶ ACTIVE ◀──── activate ────┐
//!                │                       │
//!                │ deactivate            │
//!                ▼                       │
//!             INACTIVE ──────────────────┘
//!
//!   delete (any state) removes the record permanently
//! ```
//!
//! Inactive deals are kept for history and excluded from listings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, DealId, PeerfxError, Result, UserId, constants};

/// Where the fulfiller should pay the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_name: String,
    pub bank_name: String,
}

impl BankDetails {
    #[must_use]
    pub fn new(account_name: impl Into<String>, bank_name: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            bank_name: bank_name.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("account_name", &self.account_name),
            ("bank_name", &self.bank_name),
        ] {
            if value.trim().is_empty() || value.chars().count() > constants::MAX_BANK_FIELD_LEN {
                return Err(PeerfxError::InvalidDeal {
                    reason: format!(
                        "{field} must be 1..={} characters",
                        constants::MAX_BANK_FIELD_LEN
                    ),
                });
            }
            if value.chars().any(|c| c.is_ascii_punctuation()) {
                return Err(PeerfxError::InvalidDeal {
                    reason: format!("{field} contains special characters"),
                });
            }
        }
        Ok(())
    }
}

/// A standing currency-exchange offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeDeal {
    pub id: DealId,
    pub owner: UserId,
    /// Symbol of the currency the owner holds.
    pub fund_currency: String,
    /// Quantity of fund currency on offer.
    pub fund_amount: Decimal,
    /// Symbol of the currency the owner wants.
    pub exchange_currency: String,
    /// Units of exchange currency per unit of fund currency.
    pub exchange_rate: Decimal,
    pub bank: BankDetails,
    pub exchange_address: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Store-assigned insertion sequence, breaks creation-time ties.
    pub sequence: u64,
}

impl ExchangeDeal {
    /// Most exchange currency a single transaction may request:
    /// `fund_amount × exchange_rate`.
    #[must_use]
    pub fn available_in_exchange_currency(&self) -> Option<Decimal> {
        self.fund_amount.checked_mul(self.exchange_rate)
    }

    /// Worth of the offered amount in reference units.
    #[must_use]
    pub fn reference_value(&self, fund_currency: &Currency) -> Option<Decimal> {
        fund_currency.to_reference(self.fund_amount)
    }

    /// Creation order key.
    #[must_use]
    pub fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.sequence)
    }
}

/// Request to create a deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDeal {
    pub owner: UserId,
    pub fund_currency: String,
    pub fund_amount: Decimal,
    pub exchange_currency: String,
    pub exchange_rate: Decimal,
    pub bank: BankDetails,
    #[serde(default)]
    pub exchange_address: Option<String>,
}

/// Partial update of a deal. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealUpdate {
    pub fund_currency: Option<String>,
    pub fund_amount: Option<Decimal>,
    pub exchange_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub bank: Option<BankDetails>,
    /// `Some(None)` clears the address.
    pub exchange_address: Option<Option<String>>,
    pub active: Option<bool>,
}

impl DealUpdate {
    #[must_use]
    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn activate() -> Self {
        Self {
            active: Some(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fund_currency.is_none()
            && self.fund_amount.is_none()
            && self.exchange_currency.is_none()
            && self.exchange_rate.is_none()
            && self.bank.is_none()
            && self.exchange_address.is_none()
            && self.active.is_none()
    }

    /// Apply the mutations to `deal` in place.
    pub fn apply_to(&self, deal: &mut ExchangeDeal) {
        if let Some(symbol) = &self.fund_currency {
            deal.fund_currency.clone_from(symbol);
        }
        if let Some(amount) = self.fund_amount {
            deal.fund_amount = amount;
        }
        if let Some(symbol) = &self.exchange_currency {
            deal.exchange_currency.clone_from(symbol);
        }
        if let Some(rate) = self.exchange_rate {
            deal.exchange_rate = rate;
        }
        if let Some(bank) = &self.bank {
            deal.bank = bank.clone();
        }
        if let Some(address) = &self.exchange_address {
            deal.exchange_address.clone_from(address);
        }
        if let Some(active) = self.active {
            deal.active = active;
        }
    }
}

/// Marketplace listing filters. All bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealFilter {
    pub fund_currency: Option<String>,
    pub exchange_currency: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl DealFilter {
    /// Whether `deal` passes the filter. Does not look at `active`.
    #[must_use]
    pub fn matches(&self, deal: &ExchangeDeal) -> bool {
        let symbol_ok = |want: &Option<String>, have: &str| {
            want.as_deref()
                .is_none_or(|w| w.eq_ignore_ascii_case(have))
        };
        symbol_ok(&self.fund_currency, &deal.fund_currency)
            && symbol_ok(&self.exchange_currency, &deal.exchange_currency)
            && self.min_amount.is_none_or(|min| deal.fund_amount >= min)
            && self.max_amount.is_none_or(|max| deal.fund_amount <= max)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl ExchangeDeal {
    pub fn dummy(owner: UserId, fund_amount: Decimal, exchange_rate: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: DealId::from_static("Dummy00001"),
            owner,
            fund_currency: "USD".into(),
            fund_amount,
            exchange_currency: "NGN".into(),
            exchange_rate,
            bank: BankDetails::new("Test Owner", "Test Bank"),
            exchange_address: None,
            active: true,
            created_at: now,
            updated_at: now,
            sequence: 0,
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl NewDeal {
    pub fn dummy(
        owner: UserId,
        fund_currency: &str,
        fund_amount: Decimal,
        exchange_currency: &str,
        exchange_rate: Decimal,
    ) -> Self {
        Self {
            owner,
            fund_currency: fund_currency.into(),
            fund_amount,
            exchange_currency: exchange_currency.into(),
            exchange_rate,
            bank: BankDetails::new("Test Owner", "Test Bank"),
            exchange_address: None,
        }
    }
}
