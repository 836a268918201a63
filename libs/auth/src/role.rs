//! Account roles
//!
//! Roles form a closed set. Their ordinals are part of the wire format
//! (`roleId`) and of the stored `users.role_id` column.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Role of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Role {
    Guest = 1,
    Editor = 2,
    Participant = 3,
    Administrator = 4,
}

/// Raised for role ordinals outside `1..=4`
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Invalid roleId value")]
pub struct InvalidRole(pub i64);

impl Role {
    /// Wire and storage ordinal
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Whether accounts with this role may add rooms
    pub fn can_manage_rooms(self) -> bool {
        matches!(self, Role::Editor | Role::Administrator)
    }

    pub fn is_admin(self) -> bool {
        self == Role::Administrator
    }
}

impl TryFrom<i64> for Role {
    type Error = InvalidRole;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Guest),
            2 => Ok(Role::Editor),
            3 => Ok(Role::Participant),
            4 => Ok(Role::Administrator),
            other => Err(InvalidRole(other)),
        }
    }
}

impl TryFrom<i16> for Role {
    type Error = InvalidRole;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Role::try_from(i64::from(value))
    }
}

impl From<Role> for i16 {
    fn from(role: Role) -> Self {
        role.id()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Guest => "guest",
            Role::Editor => "editor",
            Role::Participant => "participant",
            Role::Administrator => "administrator",
        };
        f.write_str(name)
    }
}
