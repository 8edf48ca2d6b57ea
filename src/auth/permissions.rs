//! Actor permission levels
//!
//! Coarse capability tiers stored on the actor record. Links can require a
//! minimum tier via [`Restriction::Level`](super::Restriction::Level).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Permission levels an actor can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
#[derive(Default)]
pub enum PermissionLevel {
    /// Logged in, no special rights
    #[default]
    Player = 0,
    /// Can moderate other actors' content
    Moderator = 1,
    /// Full administrative access
    Admin = 2,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Player => write!(f, "PLAYER"),
            PermissionLevel::Moderator => write!(f, "MODERATOR"),
            PermissionLevel::Admin => write!(f, "ADMIN"),
        }
    }
}

impl PermissionLevel {
    /// Whether this level satisfies a `required` minimum
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }
}
