use std::fmt::{Display, Formatter};

use scholaris_core::{Scope, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a user identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// User projection needed for role binding. Accounts are owned by the user module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: UserId,
    scope: Scope,
    email: Option<String>,
    display_name: String,
}

impl UserAccount {
    /// Creates a user projection.
    #[must_use]
    pub fn new(
        id: UserId,
        scope: Scope,
        email: Option<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            scope,
            email,
            display_name: display_name.into(),
        }
    }

    /// Returns the user identifier.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the tenant scope the user belongs to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the owning tenant, `None` for platform users.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.scope.tenant_id()
    }

    /// Returns the email, if recorded.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }
}
