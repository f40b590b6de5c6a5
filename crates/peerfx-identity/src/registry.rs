//! User registry: sole owner of `User` and `Profile` records.
//!
//! Every write path funnels through a single commit step, which derives
//! the trust level from the confirmation flags and stamps `updated_at`
//! before the record becomes visible. Registration creates the user and its
//! profile under one write lock: both exist afterwards or neither does.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use parking_lot::RwLock;
use peerfx_types::{
    Confirmation, IdentifierAllocator, IdentityConfig, NewUser, PeerfxError, Profile,
    ProfileUpdate, Result, User, UserDirectory, UserId, UserSnapshot, UserUpdate, Username,
    constants,
};

use crate::phone;

#[derive(Default)]
struct RegistryState {
    users: HashMap<UserId, User>,
    profiles: HashMap<UserId, Profile>,
    /// Normalized e-mail → owner.
    emails: HashMap<String, UserId>,
    /// Normalized phone → owner.
    phones: HashMap<String, UserId>,
    usernames: HashSet<Username>,
}

impl RegistryState {
    fn phone_owner(&self, phone: &str) -> Option<UserId> {
        self.phones.get(phone).copied()
    }

    /// Persist `user`, keeping the phone index in sync.
    fn commit(&mut self, mut user: User) -> User {
        user.refresh_trust_level();
        user.updated_at = Utc::now();

        if let Some(previous) = self.users.get(&user.id) {
            if let Some(old_phone) = &previous.phone {
                if user.phone.as_ref() != Some(old_phone) {
                    self.phones.remove(old_phone);
                }
            }
        }
        if let Some(phone) = &user.phone {
            self.phones.insert(phone.clone(), user.id);
        }
        self.users.insert(user.id, user.clone());
        user
    }
}

/// Thread-safe in-memory user registry.
pub struct UserRegistry {
    state: RwLock<RegistryState>,
    allocator: IdentifierAllocator,
}

impl UserRegistry {
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            allocator: IdentifierAllocator::new(config.username_allocation_attempts.max(1)),
        }
    }

    /// Register a user and create its profile.
    ///
    /// # Errors
    /// - `InvalidUser` for missing or malformed names / e-mail
    /// - `InvalidPhone` / `PhoneTaken` for a bad or reused phone number
    /// - `EmailTaken` if the e-mail is already registered
    /// - `AllocationExhausted` if no free username was found
    pub fn register(&self, request: NewUser) -> Result<(User, Profile)> {
        let email = normalize_email(&request.email)?;
        let first_name = validate_name("first_name", &request.first_name)?;
        let last_name = validate_name("last_name", &request.last_name)?;
        let phone = request.phone.as_deref().map(phone::normalize).transpose()?;

        let mut state = self.state.write();

        if state.emails.contains_key(&email) {
            tracing::warn!(email = %email, "Registration rejected: e-mail taken");
            return Err(PeerfxError::EmailTaken(email));
        }
        if let Some(phone) = &phone {
            if state.phone_owner(phone).is_some() {
                return Err(PeerfxError::PhoneTaken(phone.clone()));
            }
        }

        let username = self
            .allocator
            .username(|candidate| state.usernames.contains(&Username(candidate.to_string())))?;

        let mut user = User::new(email.clone(), first_name, last_name, phone);
        user.active = request.active;
        user.staff = request.staff;
        user.admin = request.admin;

        let profile = Profile::new(user.id, username.clone());
        let user = state.commit(user);
        state.emails.insert(email, user.id);
        state.usernames.insert(username);
        state.profiles.insert(user.id, profile.clone());

        tracing::info!(
            user = %user.id,
            username = %profile.username,
            staff = user.staff,
            admin = user.admin,
            "User registered"
        );
        Ok((user, profile))
    }

    /// Apply a partial update and recompute the trust level.
    ///
    /// Changing the phone number clears the phone confirmation.
    ///
    /// # Errors
    /// - `UserNotFound`
    /// - `InvalidUser` / `InvalidPhone` / `PhoneTaken` for bad fields
    /// - `PhoneRequired` if the phone flag would be set without a phone number
    pub fn update(&self, user_id: UserId, update: UserUpdate) -> Result<User> {
        let mut state = self.state.write();
        let mut user = state
            .users
            .get(&user_id)
            .cloned()
            .ok_or(PeerfxError::UserNotFound(user_id))?;

        if let Some(first) = &update.first_name {
            user.first_name = validate_name("first_name", first)?;
        }
        if let Some(last) = &update.last_name {
            user.last_name = validate_name("last_name", last)?;
        }
        if let Some(flags) = update.confirmations {
            user.confirmations = flags;
        }
        if let Some(requested) = &update.phone {
            let requested = requested.as_deref().map(phone::normalize).transpose()?;
            if let Some(p) = &requested {
                if state.phone_owner(p).is_some_and(|owner| owner != user_id) {
                    return Err(PeerfxError::PhoneTaken(p.clone()));
                }
            }
            if requested != user.phone {
                user.confirmations.phone = false;
            }
            user.phone = requested;
        }
        if user.confirmations.phone && user.phone.is_none() {
            return Err(PeerfxError::PhoneRequired);
        }
        if let Some(active) = update.active {
            user.active = active;
        }

        let before = state.users.get(&user_id).map(User::trust_level);
        let user = state.commit(user);
        tracing::info!(
            user = %user.id,
            from = ?before,
            level = %user.trust_level(),
            "User updated"
        );
        Ok(user)
    }

    /// Record a single confirmation and recompute the trust level.
    ///
    /// # Errors
    /// - `UserNotFound`
    /// - `PhoneRequired` when confirming a phone the user hasn't set
    pub fn confirm(&self, user_id: UserId, confirmation: Confirmation) -> Result<User> {
        let mut state = self.state.write();
        let mut user = state
            .users
            .get(&user_id)
            .cloned()
            .ok_or(PeerfxError::UserNotFound(user_id))?;

        match confirmation {
            Confirmation::Email => user.confirmations.email = true,
            Confirmation::Phone => {
                if user.phone.is_none() {
                    return Err(PeerfxError::PhoneRequired);
                }
                user.confirmations.phone = true;
            }
            Confirmation::Id => user.confirmations.id = true,
            Confirmation::Address => user.confirmations.address = true,
        }

        let user = state.commit(user);
        tracing::info!(
            user = %user.id,
            confirmation = %confirmation,
            level = %user.trust_level(),
            "Confirmation recorded"
        );
        Ok(user)
    }

    pub fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> Result<Profile> {
        let mut state = self.state.write();
        let profile = state
            .profiles
            .get_mut(&user_id)
            .ok_or(PeerfxError::UserNotFound(user_id))?;

        if let Some(gender) = update.gender {
            profile.gender = gender;
        }
        if let Some(address) = update.address {
            profile.address = address;
        }
        if let Some(country) = update.country {
            profile.country = country;
        }
        if let Some(region) = update.state {
            profile.state = region;
        }
        Ok(profile.clone())
    }

    #[must_use]
    pub fn get(&self, user_id: &UserId) -> Option<User> {
        self.state.read().users.get(user_id).cloned()
    }

    #[must_use]
    pub fn get_by_email(&self, email: &str) -> Option<User> {
        let email = normalize_email(email).ok()?;
        let state = self.state.read();
        let id = state.emails.get(&email)?;
        state.users.get(id).cloned()
    }

    #[must_use]
    pub fn profile(&self, user_id: &UserId) -> Option<Profile> {
        self.state.read().profiles.get(user_id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UserRegistry {
    fn default() -> Self {
        Self::new(&IdentityConfig::default())
    }
}

impl UserDirectory for UserRegistry {
    fn snapshot(&self, user_id: &UserId) -> Option<UserSnapshot> {
        self.state.read().users.get(user_id).map(UserSnapshot::from)
    }
}

/// Trim and lowercase the domain part.
fn normalize_email(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let invalid = |reason: &str| PeerfxError::InvalidUser {
        field: "email",
        reason: reason.to_string(),
    };
    if raw.is_empty() {
        return Err(invalid("email is required"));
    }
    let (local, domain) = raw.rsplit_once('@').ok_or_else(|| invalid("missing `@`"))?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(invalid("malformed address"));
    }
    Ok(format!("{local}@{}", domain.to_lowercase()))
}

fn validate_name(field: &'static str, raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(PeerfxError::InvalidUser {
            field,
            reason: "required".into(),
        });
    }
    if name.chars().count() > constants::MAX_NAME_LEN {
        return Err(PeerfxError::InvalidUser {
            field,
            reason: format!("at most {} characters", constants::MAX_NAME_LEN),
        });
    }
    if name.chars().any(|c| c.is_ascii_punctuation()) {
        return Err(PeerfxError::InvalidUser {
            field,
            reason: "contains special characters".into(),
        });
    }
    Ok(name.to_string())
}
