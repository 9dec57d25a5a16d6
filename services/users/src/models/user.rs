//! User model and related functionality

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use uuid::Uuid;

use crate::error::UserError;

/// Identifier of a user record, assigned by the store
pub type UserId = Uuid;

/// Identifier of a library owned by the library collection
pub type LibraryId = String;

/// User entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Opaque credential (e.g. a password hash); never inspected here
    pub credential_secret: String,
    pub is_administrator: bool,
    /// Blanket access to every library
    pub shared_all_libraries: bool,
    /// Explicit grants, only consulted when `shared_all_libraries` is off
    pub shared_library_ids: BTreeSet<LibraryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Roles derived from the stored flags
    pub fn roles(&self) -> Vec<Role> {
        if self.is_administrator {
            vec![Role::Admin]
        } else {
            Vec::new()
        }
    }
}

/// New user creation payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub credential_secret: String,
    pub is_administrator: bool,
    pub shared_all_libraries: bool,
    pub shared_library_ids: BTreeSet<LibraryId>,
}

impl NewUser {
    /// A non-administrator with no credential yet and access to all libraries
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            credential_secret: String::new(),
            is_administrator: false,
            shared_all_libraries: true,
            shared_library_ids: BTreeSet::new(),
        }
    }

    pub fn with_credential(mut self, secret: impl Into<String>) -> Self {
        self.credential_secret = secret.into();
        self
    }

    pub fn administrator(mut self, is_administrator: bool) -> Self {
        self.is_administrator = is_administrator;
        self
    }

    pub fn with_library_grants(
        mut self,
        shared_all_libraries: bool,
        shared_library_ids: impl IntoIterator<Item = LibraryId>,
    ) -> Self {
        self.shared_all_libraries = shared_all_libraries;
        self.shared_library_ids = shared_library_ids.into_iter().collect();
        self
    }

    /// Attach the store-assigned fields
    pub(crate) fn into_user(self, id: UserId, now: DateTime<Utc>) -> User {
        User {
            id,
            email: self.email,
            credential_secret: self.credential_secret,
            is_administrator: self.is_administrator,
            shared_all_libraries: self.shared_all_libraries,
            shared_library_ids: self.shared_library_ids,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Elevated roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
        }
    }

    /// Parse a role list, rejecting the first unknown name
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<BTreeSet<Role>, UserError> {
        names.iter().map(|name| name.as_ref().parse::<Role>()).collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            other => Err(UserError::InvalidRole(other.to_string())),
        }
    }
}

/// Lower-cased projection used for email uniqueness and lookups
///
/// Both stores key emails on this value. PostgreSQL stores it in
/// `users.email_key` rather than folding with `lower()`, whose result on
/// non-ASCII input depends on the database collation.
pub fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

/// Current time at the precision the database stores (microseconds)
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Modification timestamp for an update of a record last modified at
/// `previous`; always strictly later than `previous`.
pub fn next_modification(previous: DateTime<Utc>) -> DateTime<Utc> {
    now().max(previous + TimeDelta::microseconds(1))
}
