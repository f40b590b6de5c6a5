//! Access policy consumed by callers before mutating marketplace state.
//!
//! The engines assume authorization already happened. Callers resolve an
//! [`Actor`] (a verified API-key project or a registered user), then ask an
//! [`AccessPolicy`] whether that actor may perform an [`Operation`] on a
//! target owned by some user.
//!
//! API keys have the form `<prefix>.<secret>`. Only the SHA-256 digest of
//! the full key is stored; the prefix is the lookup handle.

use std::collections::HashMap;

use parking_lot::RwLock;
use peerfx_types::{PeerfxError, Result, UserId, UserSnapshot, constants};
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// A client project that authenticates with API keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub active: bool,
    pub staff: bool,
    pub admin: bool,
}

/// Who is asking.
#[derive(Debug, Clone)]
pub enum Actor {
    Project(Project),
    User(UserSnapshot),
}

/// Operations gated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    ReadCurrency,
    ListDeals,
    CreateDeal,
    UpdateDeal,
    DeleteDeal,
    CreateTransaction,
    UpdateTransaction,
    DeleteTransaction,
}

impl Operation {
    fn is_owner_scoped(self) -> bool {
        !matches!(self, Self::ReadCurrency | Self::ListDeals)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ReadCurrency => "read currency",
            Self::ListDeals => "list deals",
            Self::CreateDeal => "create deal",
            Self::UpdateDeal => "update deal",
            Self::DeleteDeal => "delete deal",
            Self::CreateTransaction => "create transaction",
            Self::UpdateTransaction => "update transaction",
            Self::DeleteTransaction => "delete transaction",
        };
        f.write_str(s)
    }
}

/// Authorization predicate.
pub trait AccessPolicy: Send + Sync {
    /// `target_owner` is the user owning the entity (or on whose behalf it is
    /// created); `None` for operations without an owner.
    fn is_authorized(&self, actor: &Actor, operation: Operation, target_owner: Option<UserId>)
    -> bool;

    /// [`Self::is_authorized`] as a `Result`.
    fn authorize(
        &self,
        actor: &Actor,
        operation: Operation,
        target_owner: Option<UserId>,
    ) -> Result<()> {
        if self.is_authorized(actor, operation, target_owner) {
            Ok(())
        } else {
            tracing::warn!(?operation, ?target_owner, "Access denied");
            Err(PeerfxError::Unauthorized {
                operation: operation.to_string(),
            })
        }
    }
}

/// Staff/admin project keys and admin users may do anything. Other active
/// users may browse and act on entities they own.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaffPolicy;

impl AccessPolicy for StaffPolicy {
    fn is_authorized(
        &self,
        actor: &Actor,
        operation: Operation,
        target_owner: Option<UserId>,
    ) -> bool {
        match actor {
            Actor::Project(project) => project.active && (project.staff || project.admin),
            Actor::User(user) if !user.active => false,
            Actor::User(user) if user.admin => true,
            Actor::User(user) => {
                !operation.is_owner_scoped() || target_owner == Some(user.id)
            }
        }
    }
}

struct KeyRecord {
    project: String,
    digest: [u8; 32],
    revoked: bool,
}

#[derive(Default)]
struct KeyState {
    projects: HashMap<String, Project>,
    /// Key prefix → record.
    keys: HashMap<String, KeyRecord>,
}

/// Issues and verifies project API keys.
#[derive(Default)]
pub struct ApiKeyRegistry {
    state: RwLock<KeyState>,
}

impl ApiKeyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_project(&self, name: &str, staff: bool, admin: bool) -> Result<Project> {
        let mut state = self.state.write();
        if state.projects.contains_key(name) {
            return Err(PeerfxError::DuplicateProject(name.to_string()));
        }
        let project = Project {
            name: name.to_string(),
            active: true,
            staff,
            admin,
        };
        state.projects.insert(name.to_string(), project.clone());
        tracing::info!(project = name, staff, admin, "Project created");
        Ok(project)
    }

    /// Enable or disable every key of a project at once.
    pub fn set_project_active(&self, name: &str, active: bool) -> Result<()> {
        let mut state = self.state.write();
        let project = state
            .projects
            .get_mut(name)
            .ok_or(PeerfxError::InvalidApiKey)?;
        project.active = active;
        Ok(())
    }

    /// Issue a new key. The returned string is the only copy of the secret.
    pub fn issue(&self, project: &str) -> Result<String> {
        let mut rng = rand::thread_rng();
        let mut state = self.state.write();
        if !state.projects.contains_key(project) {
            return Err(PeerfxError::InvalidApiKey);
        }

        let prefix = loop {
            let candidate = random_alphanumeric(&mut rng, constants::API_KEY_PREFIX_LEN);
            if !state.keys.contains_key(&candidate) {
                break candidate;
            }
        };
        let secret = random_alphanumeric(&mut rng, constants::API_KEY_SECRET_LEN);
        let key = format!("{prefix}.{secret}");

        state.keys.insert(
            prefix.clone(),
            KeyRecord {
                project: project.to_string(),
                digest: digest(&key),
                revoked: false,
            },
        );
        tracing::info!(
            project,
            prefix = %prefix,
            fingerprint = %key_fingerprint(&key),
            "API key issued"
        );
        Ok(key)
    }

    /// Resolve a presented key to its project.
    ///
    /// # Errors
    /// `InvalidApiKey` if the key is malformed, unknown, revoked, or its
    /// project is inactive.
    pub fn verify(&self, key: &str) -> Result<Project> {
        let (prefix, _) = key.split_once('.').ok_or(PeerfxError::InvalidApiKey)?;
        let state = self.state.read();
        let record = state.keys.get(prefix).ok_or(PeerfxError::InvalidApiKey)?;
        if record.revoked || !bool::from(record.digest[..].ct_eq(&digest(key)[..])) {
            return Err(PeerfxError::InvalidApiKey);
        }
        state
            .projects
            .get(&record.project)
            .filter(|p| p.active)
            .cloned()
            .ok_or(PeerfxError::InvalidApiKey)
    }

    /// Revoke a key by prefix. Returns `false` if no such key exists.
    pub fn revoke(&self, prefix: &str) -> bool {
        match self.state.write().keys.get_mut(prefix) {
            Some(record) => {
                record.revoked = true;
                tracing::info!(prefix, "API key revoked");
                true
            }
            None => false,
        }
    }
}

fn random_alphanumeric<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

fn digest(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(key.as_bytes()));
    out
}

/// Hex form of a key digest, for audit logs.
#[must_use]
pub fn key_fingerprint(key: &str) -> String {
    hex::encode(&digest(key)[..8])
}
