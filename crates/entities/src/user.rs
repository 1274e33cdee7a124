//! User-related entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role-based access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular shopper.
    #[default]
    Customer,
    /// Store administrator.
    Admin,
}

impl UserRole {
    /// Converts the role to a string for storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "customer" => Some(Self::Customer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Checks if this role has admin privileges.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user.
///
/// The password hash is never serialized; it only travels between the store
/// and the password verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address, unique across users.
    pub email: String,
    /// Argon2 PHC string. `None` for accounts created through Google login.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    /// Linked Google account identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_id: Option<String>,
    /// Access role.
    pub role: UserRole,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Free-form postal address.
    pub address: Option<String>,
    /// When this record was created.
    pub created_at: DateTime<Utc>,
    /// When this record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new customer.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            password_hash: None,
            google_id: None,
            role: UserRole::Customer,
            phone: None,
            address: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the password hash.
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Links a Google account.
    pub fn with_google_id(mut self, google_id: impl Into<String>) -> Self {
        self.google_id = Some(google_id.into());
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }

    /// Checks if the user can perform admin actions.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
