//! Session identity supplied by the caller.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role assigned to a session. Roles are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Officer,
    Reader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Officer => write!(f, "officer"),
            Role::Reader => write!(f, "reader"),
        }
    }
}

/// An authenticated actor. The engine trusts this as already verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn officer(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Officer)
    }

    pub fn reader(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Reader)
    }
}
