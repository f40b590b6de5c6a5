//! Identifiers used throughout PeerFX.
//!
//! Users are keyed by a UUIDv7 [`UserId`]. Deals and transactions carry a
//! short, human-shareable 10-character alphanumeric [`ShortId`] that is
//! allocated once at creation time (see [`crate::IdentifierAllocator`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Unique identifier for a user account. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ShortId
// ---------------------------------------------------------------------------

/// Fixed-length alphanumeric identifier (`[A-Za-z0-9]{10}`).
///
/// Deserialization rejects anything [`ShortId::parse`] would.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShortId(String);

impl ShortId {
    /// Parse a short identifier, returning `None` if it has the wrong shape.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::is_well_formed(raw).then(|| Self(raw.to_string()))
    }

    /// Whether `raw` is exactly [`constants::SHORT_ID_LEN`] ASCII alphanumerics.
    #[must_use]
    pub fn is_well_formed(raw: &str) -> bool {
        raw.len() == constants::SHORT_ID_LEN && raw.bytes().all(|b| b.is_ascii_alphanumeric())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap an allocator output.
    pub(crate) fn from_generated(raw: String) -> Self {
        debug_assert!(Self::is_well_formed(&raw));
        Self(raw)
    }
}

impl TryFrom<String> for ShortId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if Self::is_well_formed(&raw) {
            Ok(Self(raw))
        } else {
            Err(format!(
                "malformed short identifier `{raw}`: expected {} ASCII alphanumerics",
                constants::SHORT_ID_LEN
            ))
        }
    }
}

impl From<ShortId> for String {
    fn from(id: ShortId) -> Self {
        id.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DealId / TransactionId
// ---------------------------------------------------------------------------

macro_rules! short_id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub ShortId);

        impl $name {
            /// Parse from the wire form, returning `None` if malformed.
            #[must_use]
            pub fn parse(raw: &str) -> Option<Self> {
                ShortId::parse(raw).map(Self)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        #[cfg(any(test, feature = "test-helpers"))]
        impl $name {
            /// Build from a literal. Panics if the literal is malformed.
            pub fn from_static(raw: &'static str) -> Self {
                Self::parse(raw).expect("literal short id must be 10 alphanumerics")
            }
        }
    };
}

short_id_newtype!(
    /// Public identifier of an [`crate::ExchangeDeal`].
    DealId
);

short_id_newtype!(
    /// Public identifier of an [`crate::ExchangeTransaction`].
    TransactionId
);

// ---------------------------------------------------------------------------
// Username
// ---------------------------------------------------------------------------

/// Public profile handle, generated as `user` followed by five digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(pub String);

impl Username {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
