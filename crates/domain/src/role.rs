use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use scholaris_core::{RbacError, RbacResult, Scope, TenantId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hierarchy::RoleKind;
use crate::permission::{Permission, PermissionCode};

/// Unique identifier for a role record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
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

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated role name, trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Creates a validated role name.
    pub fn new(value: impl Into<String>) -> RbacResult<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(RbacError::RoleNameRequired);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

impl TryFrom<String> for RoleName {
    type Error = RbacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Role aggregate with its resolved permission set.
///
/// Serialize-only: the kind is derived from the name and system flag, so
/// roles are built through [`Role::new`] rather than decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    id: RoleId,
    scope: Scope,
    name: RoleName,
    description: String,
    is_system: bool,
    kind: RoleKind,
    permissions: Vec<Permission>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Role {
    /// Creates a role snapshot. Duplicate permissions are collapsed.
    #[must_use]
    pub fn new(
        id: RoleId,
        scope: Scope,
        name: RoleName,
        description: impl Into<String>,
        is_system: bool,
        permissions: Vec<Permission>,
    ) -> Self {
        let kind = RoleKind::classify(name.as_str(), scope, is_system);
        let now = Utc::now();

        Self {
            id,
            scope,
            name,
            description: description.into(),
            is_system,
            kind,
            permissions: normalize_permissions(permissions),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the row timestamps with stored values.
    #[must_use]
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role scope.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Returns the owning tenant, `None` for global roles.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.scope.tenant_id()
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &RoleName {
        &self.name
    }

    /// Returns the free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns whether the role is an immutable system role.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    /// Returns the hierarchy kind derived at load time.
    #[must_use]
    pub fn kind(&self) -> RoleKind {
        self.kind
    }

    /// Returns the permissions granted by this role, ordered by code.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        self.permissions.as_slice()
    }

    /// Returns whether the role grants the permission code.
    #[must_use]
    pub fn grants(&self, code: PermissionCode) -> bool {
        self.permissions
            .iter()
            .any(|permission| permission.code() == code)
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn normalize_permissions(permissions: Vec<Permission>) -> Vec<Permission> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Permission> = permissions
        .into_iter()
        .filter(|permission| seen.insert(permission.id()))
        .collect();
    unique.sort_by(|left, right| left.code().cmp(&right.code()));
    unique
}
