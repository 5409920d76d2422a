use async_trait::async_trait;

use scholaris_core::{RbacResult, Scope, TenantContext, TenantId};
use scholaris_domain::{PermissionId, Role, RoleId, RoleName};

/// Input payload for creating roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Owning tenant, `None` for the global scope.
    pub tenant_id: Option<TenantId>,
    /// Role name, unique within its scope.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Marks the role immutable.
    pub is_system: bool,
    /// Initial grants.
    pub permission_ids: Vec<PermissionId>,
}

/// Partial update of role details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateRoleInput {
    /// New name, if changing.
    pub name: Option<String>,
    /// New description, if changing.
    pub description: Option<String>,
}

/// Listing filter for roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleListFilter {
    /// Restricts results to this tenant plus global roles.
    pub tenant_id: Option<TenantId>,
    /// Includes system roles.
    pub include_system: bool,
    /// Case-insensitive substring match on name or description.
    pub search: Option<String>,
}

impl RoleListFilter {
    /// Returns whether a role passes the filter.
    #[must_use]
    pub fn matches(&self, role: &Role) -> bool {
        let scope_matches = self
            .tenant_id
            .is_none_or(|tenant_id| role.scope() == Scope::Tenant(tenant_id) || role.scope().is_global());
        let system_matches = self.include_system || !role.is_system();
        let search_matches = self.search.as_deref().is_none_or(|search| {
            let needle = search.trim().to_lowercase();
            role.name().as_str().to_lowercase().contains(needle.as_str())
                || role.description().to_lowercase().contains(needle.as_str())
        });

        scope_matches && system_matches && search_matches
    }
}

/// Validated role row ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    /// Role scope.
    pub scope: Scope,
    /// Role name.
    pub name: RoleName,
    /// Free-form description.
    pub description: String,
    /// Marks the role immutable.
    pub is_system: bool,
    /// Resolved grants.
    pub permission_ids: Vec<PermissionId>,
}

/// Full replacement of the editable role columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDetailsUpdate {
    /// Scope the name must stay unique in.
    pub scope: Scope,
    /// New name.
    pub name: RoleName,
    /// New description.
    pub description: String,
}

/// Repository port for role lifecycle and role-permission associations.
///
/// Reads are filtered by the caller's `TenantContext`. Every write is one
/// transaction.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Finds one visible role with permissions populated.
    async fn find_role(&self, context: TenantContext, role_id: RoleId) -> RbacResult<Option<Role>>;

    /// Finds the visible roles among `role_ids`, skipping missing ones.
    async fn find_roles(&self, context: TenantContext, role_ids: &[RoleId])
    -> RbacResult<Vec<Role>>;

    /// Finds a role by name in `scope`; tenant scopes also match global roles.
    async fn find_role_by_name(
        &self,
        context: TenantContext,
        scope: Scope,
        name: &str,
    ) -> RbacResult<Option<Role>>;

    /// Returns whether `name` collides in `scope`, ignoring `exclude`.
    async fn role_name_taken(
        &self,
        scope: Scope,
        name: &RoleName,
        exclude: Option<RoleId>,
    ) -> RbacResult<bool>;

    /// Lists visible roles, system roles first then by name.
    async fn list_roles(
        &self,
        context: TenantContext,
        filter: &RoleListFilter,
    ) -> RbacResult<Vec<Role>>;

    /// Inserts a role with its grants; fails `RoleNameExists` on collision.
    async fn insert_role(&self, role: NewRole) -> RbacResult<RoleId>;

    /// Rewrites name and description; fails `RoleNameExists` on collision.
    async fn update_role_details(&self, role_id: RoleId, update: RoleDetailsUpdate)
    -> RbacResult<()>;

    /// Counts user assignments referencing the role.
    async fn count_role_assignments(&self, role_id: RoleId) -> RbacResult<u64>;

    /// Clears grants and deletes the role; fails `RoleInUse` if still assigned.
    async fn delete_role(&self, role_id: RoleId) -> RbacResult<()>;

    /// Adds grants, ignoring ones already held.
    async fn append_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()>;

    /// Replaces every grant.
    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()>;

    /// Removes grants, ignoring ones not held.
    async fn remove_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()>;
}
