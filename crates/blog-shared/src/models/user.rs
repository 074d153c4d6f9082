use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role carried by an authenticated principal.
///
/// Roles form an open set: anything that is not `admin` is kept verbatim so
/// that newer tokens keep round-tripping through older servers. Known role
/// names match regardless of ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    #[default]
    User,
    Other(String),
}

impl Role {
    /// Elevated roles satisfy ownership checks without being the author.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Admin)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Other(role) => role,
        }
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        if role.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else if role.eq_ignore_ascii_case("user") {
            Self::User
        } else {
            Self::Other(role)
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            role => role.as_str().to_string(),
        }
    }
}

/// Author reference captured when a post, node or like is created.
///
/// The username is a snapshot; it is never re-resolved against the user
/// directory afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub user_id: Uuid,
    pub username: String,
}

impl Author {
    /// Author used for content the service creates on its own (seed threads).
    pub fn system(username: &str) -> Self {
        Self {
            user_id: Uuid::nil(),
            username: username.to_string(),
        }
    }
}
