//! Read-only view of the identity subsystem for the marketplace engines.
//!
//! Engines never mutate identity records. They look up a [`UserSnapshot`]
//! through a [`UserDirectory`] implemented by the identity crate (or a test
//! double).

use serde::{Deserialize, Serialize};

use crate::{TrustLevel, User, UserId};

/// The subset of a user record the marketplace reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: UserId,
    pub active: bool,
    pub staff: bool,
    pub admin: bool,
    pub trust_level: TrustLevel,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            active: user.active,
            staff: user.staff,
            admin: user.admin,
            trust_level: user.trust_level(),
        }
    }
}

/// Lookup of users by ID.
pub trait UserDirectory: Send + Sync {
    fn snapshot(&self, user_id: &UserId) -> Option<UserSnapshot>;
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_directory {
    use std::collections::HashMap;

    use parking_lot::RwLock;

    use super::{UserDirectory, UserSnapshot};
    use crate::{TrustLevel, UserId};

    /// Fixed in-memory directory for engine tests.
    #[derive(Default)]
    pub struct StaticDirectory {
        users: RwLock<HashMap<UserId, UserSnapshot>>,
    }

    impl StaticDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        /// Register an active user and return its ID.
        pub fn add_active(&self) -> UserId {
            self.add(true)
        }

        pub fn add(&self, active: bool) -> UserId {
            let id = UserId::new();
            self.users.write().insert(
                id,
                UserSnapshot {
                    id,
                    active,
                    staff: false,
                    admin: false,
                    trust_level: TrustLevel::Level0,
                },
            );
            id
        }

        pub fn set_active(&self, id: UserId, active: bool) {
            if let Some(user) = self.users.write().get_mut(&id) {
                user.active = active;
            }
        }
    }

    impl UserDirectory for StaticDirectory {
        fn snapshot(&self, user_id: &UserId) -> Option<UserSnapshot> {
            self.users.read().get(user_id).copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_directory::StaticDirectory;
    use super::*;

    #[test]
    fn snapshot_from_user() {
        let user = User::dummy("a@b.c");
        let snap = UserSnapshot::from(&user);
        assert_eq!(snap.id, user.id);
        assert!(snap.active);
        assert_eq!(snap.trust_level, TrustLevel::Level0);
    }

    #[test]
    fn static_directory_lookup() {
        let dir = StaticDirectory::new();
        let id = dir.add(false);
        assert!(!dir.snapshot(&id).unwrap().active);
        dir.set_active(id, true);
        assert!(dir.snapshot(&id).unwrap().active);
        assert!(dir.snapshot(&UserId::new()).is_none());
    }

    #[test]
    fn static_directory_shared_across_threads() {
        let dir = StaticDirectory::new();
        let ids: Vec<UserId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..25).map(|_| dir.add_active()).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect()
        });
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| dir.snapshot(id).is_some_and(|u| u.active)));
    }
}
