use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::TenantId;

/// Where a role or user lives.
///
/// `Global` is the shared namespace of system roles and platform operators;
/// `Tenant` rows are invisible outside their tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tenant_id", rename_all = "snake_case")]
pub enum Scope {
    /// Shared across every tenant.
    Global,
    /// Owned by one tenant.
    Tenant(TenantId),
}

impl Scope {
    /// Builds a scope from a nullable tenant column.
    #[must_use]
    pub fn from_tenant_id(tenant_id: Option<TenantId>) -> Self {
        match tenant_id {
            Some(tenant_id) => Self::Tenant(tenant_id),
            None => Self::Global,
        }
    }

    /// Returns the tenant for tenant-owned scopes.
    #[must_use]
    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            Self::Global => None,
            Self::Tenant(tenant_id) => Some(*tenant_id),
        }
    }

    /// Returns whether this is the shared global scope.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Returns whether a role in this scope may be held by a user in `user_scope`.
    ///
    /// Global roles are assignable to anyone. Tenant roles only to users of
    /// the same tenant.
    #[must_use]
    pub fn admits(&self, user_scope: Scope) -> bool {
        match self {
            Self::Global => true,
            Self::Tenant(tenant_id) => user_scope == Self::Tenant(*tenant_id),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(formatter, "global"),
            Self::Tenant(tenant_id) => write!(formatter, "tenant:{tenant_id}"),
        }
    }
}

/// Ambient visibility of the caller, derived from the trusted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantContext {
    /// Platform operator; sees and writes every row.
    Platform,
    /// Member of one tenant; sees its own rows plus global rows.
    Tenant(TenantId),
}

impl TenantContext {
    /// Returns whether rows in `scope` are visible to this context.
    #[must_use]
    pub fn can_see(&self, scope: Scope) -> bool {
        match (self, scope) {
            (Self::Platform, _) | (Self::Tenant(_), Scope::Global) => true,
            (Self::Tenant(own), Scope::Tenant(other)) => *own == other,
        }
    }

    /// Returns whether this context may write rows in `scope`.
    #[must_use]
    pub fn can_write(&self, scope: Scope) -> bool {
        match (self, scope) {
            (Self::Platform, _) => true,
            (Self::Tenant(_), Scope::Global) => false,
            (Self::Tenant(own), Scope::Tenant(other)) => *own == other,
        }
    }

    /// Returns the tenant filter applied to store queries, `None` for platform callers.
    #[must_use]
    pub fn tenant_filter(&self) -> Option<TenantId> {
        match self {
            Self::Platform => None,
            Self::Tenant(tenant_id) => Some(*tenant_id),
        }
    }
}
