use std::fmt;

use serde::{Deserialize, Serialize};

/// The identity returned by login, register, and `GET /api/auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Server-assigned user identifier.
    pub id: String,

    /// Email address used to sign in.
    pub email: String,

    /// Display name.
    pub username: String,

    /// Authorization role.
    pub role: Role,
}

/// A user's role, as reported by the server.
///
/// Roles this client knows about deserialize into [`KnownRole`]; anything
/// else is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Role {
    /// A role this client recognizes.
    Known(KnownRole),

    /// Any other role string.
    Custom(String),
}

/// Roles with a fixed meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KnownRole {
    /// A regular user.
    User,
    /// An administrator.
    Admin,
}

impl Role {
    /// Returns true for the administrator role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Known(KnownRole::Admin))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Known(KnownRole::User) => write!(f, "USER"),
            Role::Known(KnownRole::Admin) => write!(f, "ADMIN"),
            Role::Custom(role) => write!(f, "{role}"),
        }
    }
}

impl From<KnownRole> for Role {
    fn from(role: KnownRole) -> Self {
        Role::Known(role)
    }
}
