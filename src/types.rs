//! Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Portal roles. The serialized strings are part of the token wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Admin,
    SupportAdmin,
    SupportHeadAdmin,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Client,
        Role::Admin,
        Role::SupportAdmin,
        Role::SupportHeadAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
            Role::SupportAdmin => "support_admin",
            Role::SupportHeadAdmin => "support_head_admin",
        }
    }

    /// Whether the role belongs to agency staff or to a customer account.
    pub fn kind(&self) -> UserKind {
        match self {
            Role::Client => UserKind::Client,
            Role::Admin | Role::SupportAdmin | Role::SupportHeadAdmin => UserKind::Internal,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role '{0}' (expected one of: client, admin, support_admin, support_head_admin)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Internal staff vs. customer accounts, derived from the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserKind {
    Internal,
    Client,
}
