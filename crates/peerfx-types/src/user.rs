//! User and profile records owned by the identity subsystem.
//!
//! A [`User`]'s trust level is private: it can only be changed through
//! [`User::refresh_trust_level`], which derives it from the confirmation
//! flags. Registries call it on every write, before committing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConfirmationFlags, TrustLevel, UserId, Username, compute_level};

/// An identity record.
///
/// Deserializing recomputes the trust level from the confirmation flags; a
/// serialized `trust_level` is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredUser")]
pub struct User {
    pub id: UserId,
    /// Normalized e-mail address (domain lowercased).
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Phone number in `+<digits>` form, spaces stripped.
    pub phone: Option<String>,
    pub active: bool,
    pub staff: bool,
    pub admin: bool,
    pub confirmations: ConfirmationFlags,
    trust_level: TrustLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct StoredUser {
    id: UserId,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    active: bool,
    staff: bool,
    admin: bool,
    confirmations: ConfirmationFlags,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        let mut user = Self {
            id: stored.id,
            email: stored.email,
            first_name: stored.first_name,
            last_name: stored.last_name,
            phone: stored.phone,
            active: stored.active,
            staff: stored.staff,
            admin: stored.admin,
            confirmations: stored.confirmations,
            trust_level: TrustLevel::Level0,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        };
        user.refresh_trust_level();
        user
    }
}

impl User {
    /// Build a fresh record. The trust level is derived immediately.
    #[must_use]
    pub fn new(
        email: String,
        first_name: String,
        last_name: String,
        phone: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let mut user = Self {
            id: UserId::new(),
            email,
            first_name,
            last_name,
            phone,
            active: false,
            staff: false,
            admin: false,
            confirmations: ConfirmationFlags::default(),
            trust_level: TrustLevel::Level0,
            created_at: now,
            updated_at: now,
        };
        user.refresh_trust_level();
        user
    }

    #[must_use]
    pub fn trust_level(&self) -> TrustLevel {
        self.trust_level
    }

    /// Recompute the derived trust level from the confirmation flags.
    pub fn refresh_trust_level(&mut self) {
        self.trust_level = compute_level(self.confirmations);
    }

    /// `"First Last"` with each part capitalized.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", capitalize(&self.first_name), capitalize(&self.last_name))
    }
}

fn capitalize(part: &str) -> String {
    let lower = part.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Self-declared gender on a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    NotSelected,
    Male,
    Female,
}

/// Public-facing profile, created together with its [`User`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub username: Username,
    pub gender: Gender,
    pub address: String,
    pub country: String,
    pub state: String,
}

impl Profile {
    #[must_use]
    pub fn new(user_id: UserId, username: Username) -> Self {
        Self {
            user_id,
            username,
            gender: Gender::NotSelected,
            address: String::new(),
            country: String::new(),
            state: String::new(),
        }
    }
}

/// Registration request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub staff: bool,
    #[serde(default)]
    pub admin: bool,
}

/// Partial update of a user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `Some(None)` clears the phone number.
    pub phone: Option<Option<String>>,
    pub active: Option<bool>,
    pub confirmations: Option<ConfirmationFlags>,
}

/// Partial update of a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
}

/// A single identity confirmation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confirmation {
    Email,
    Phone,
    Id,
    Address,
}

impl std::fmt::Display for Confirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "EMAIL"),
            Self::Phone => write!(f, "PHONE"),
            Self::Id => write!(f, "ID"),
            Self::Address => write!(f, "ADDRESS"),
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl User {
    /// An active user with no confirmations.
    pub fn dummy(email: &str) -> Self {
        let mut user = Self::new(email.to_string(), "test".into(), "user".into(), None);
        user.active = true;
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_starts_at_level_zero() {
        let user = User::new("a@b.c".into(), "ada".into(), "lovelace".into(), None);
        assert_eq!(user.trust_level(), TrustLevel::Level0);
        assert!(!user.active);
    }

    #[test]
    fn refresh_follows_flags() {
        let mut user = User::dummy("a@b.c");
        user.confirmations.email = true;
        user.confirmations.phone = true;
        // Not yet refreshed.
        assert_eq!(user.trust_level(), TrustLevel::Level0);
        user.refresh_trust_level();
        assert_eq!(user.trust_level(), TrustLevel::Level1);
    }

    #[test]
    fn full_name_capitalizes() {
        let user = User::new("a@b.c".into(), "aDA".into(), "lovelace".into(), None);
        assert_eq!(user.full_name(), "Ada Lovelace");
    }

    #[test]
    fn trust_level_survives_serde() {
        let mut user = User::dummy("a@b.c");
        user.confirmations = ConfirmationFlags {
            email: true,
            phone: true,
            id: true,
            address: false,
        };
        user.refresh_trust_level();
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back.trust_level(), TrustLevel::Level2);
    }

    #[test]
    fn serialized_trust_level_is_not_trusted() {
        let user = User::dummy("a@b.c");
        let mut value = serde_json::to_value(&user).unwrap();
        value["trust_level"] = serde_json::to_value(TrustLevel::Level3).unwrap();
        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back.trust_level(), TrustLevel::Level0);
    }
}
