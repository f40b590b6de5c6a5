//! Trust levels derived from identity confirmations.
//!
//! ## Stages
//!
//! ```text
//!   Level 0 ──(email AND phone)──▶ Level 1 ──(id)──▶ Level 2 ──(address)──▶ Level 3
//! ```
//!
//! Stages must be satisfied in order: a confirmed ID does not count until
//! both e-mail and phone are confirmed, and so on. The level is never stored
//! independently of the flags; it is recomputed with [`compute_level`]
//! before every write of a user record.

use serde::{Deserialize, Serialize};

/// The four independent identity confirmations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationFlags {
    pub email: bool,
    pub phone: bool,
    pub id: bool,
    pub address: bool,
}

impl ConfirmationFlags {
    /// Per-stage completion percentages.
    #[must_use]
    pub fn stage_progress(&self) -> StageProgress {
        let level_one = match (self.email, self.phone) {
            (true, true) => 100,
            (false, false) => 0,
            _ => 50,
        };
        StageProgress {
            level_one,
            level_two: if self.id { 100 } else { 0 },
            level_three: if self.address { 100 } else { 0 },
        }
    }
}

/// How far along each verification stage a user is, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    pub level_one: u8,
    pub level_two: u8,
    pub level_three: u8,
}

/// Ordinal trust level, 0 through 3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TrustLevel {
    #[default]
    Level0,
    Level1,
    Level2,
    Level3,
}

impl TrustLevel {
    #[must_use]
    pub fn as_ordinal(self) -> u8 {
        match self {
            Self::Level0 => 0,
            Self::Level1 => 1,
            Self::Level2 => 2,
            Self::Level3 => 3,
        }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Level {}", self.as_ordinal())
    }
}

/// Compute the trust level for a set of confirmations.
#[must_use]
pub fn compute_level(flags: ConfirmationFlags) -> TrustLevel {
    if !(flags.email && flags.phone) {
        return TrustLevel::Level0;
    }
    if !flags.id {
        return TrustLevel::Level1;
    }
    if !flags.address {
        return TrustLevel::Level2;
    }
    TrustLevel::Level3
}
