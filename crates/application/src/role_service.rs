use std::collections::BTreeSet;
use std::sync::Arc;

use scholaris_core::{RbacError, RbacResult, Scope, TenantContext, TenantId};
use scholaris_domain::{Permission, PermissionId, Role, RoleId, RoleName};
use tracing::info;

use crate::{
    CreateRoleInput, NewRole, PermissionFilter, PermissionRegistry, RoleDetailsUpdate,
    RoleListFilter, RoleRepository, UpdateRoleInput,
};

mod permissions;
mod seed;

#[cfg(test)]
mod tests;

pub use seed::SeedReport;

/// Application service owning role lifecycle and role-permission grants.
#[derive(Clone)]
pub struct RoleService {
    permission_registry: Arc<dyn PermissionRegistry>,
    repository: Arc<dyn RoleRepository>,
}

impl RoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        permission_registry: Arc<dyn PermissionRegistry>,
        repository: Arc<dyn RoleRepository>,
    ) -> Self {
        Self {
            permission_registry,
            repository,
        }
    }

    /// Creates a role and returns it reloaded with permissions populated.
    pub async fn create_role(
        &self,
        context: TenantContext,
        input: CreateRoleInput,
    ) -> RbacResult<Role> {
        let name = RoleName::new(input.name)?;
        let scope = Scope::from_tenant_id(input.tenant_id);

        if !context.can_write(scope) {
            return Err(RbacError::AccessDenied(format!(
                "cannot create roles in scope '{scope}'"
            )));
        }
        if input.is_system && (!scope.is_global() || context != TenantContext::Platform) {
            return Err(RbacError::AccessDenied(
                "system roles can only be created in the global scope by platform operators"
                    .to_owned(),
            ));
        }

        let permissions = self.resolve_permissions(&input.permission_ids).await?;

        if self.repository.role_name_taken(scope, &name, None).await? {
            return Err(RbacError::RoleNameExists(name.to_string()));
        }

        let role_id = self
            .repository
            .insert_role(NewRole {
                scope,
                name: name.clone(),
                description: input.description,
                is_system: input.is_system,
                permission_ids: permissions.iter().map(Permission::id).collect(),
            })
            .await?;

        info!(%role_id, role_name = %name, %scope, is_system = input.is_system, "role created");

        self.reload(context, role_id).await
    }

    /// Returns a visible role by id.
    pub async fn get_role(&self, context: TenantContext, role_id: RoleId) -> RbacResult<Role> {
        self.repository
            .find_role(context, role_id)
            .await?
            .ok_or_else(|| RbacError::RoleNotFound(role_id.to_string()))
    }

    /// Returns a role by name using the same scope rules as creation.
    pub async fn get_role_by_name(
        &self,
        context: TenantContext,
        name: &str,
        tenant_id: Option<TenantId>,
    ) -> RbacResult<Role> {
        self.repository
            .find_role_by_name(context, Scope::from_tenant_id(tenant_id), name.trim())
            .await?
            .ok_or_else(|| RbacError::RoleNotFound(name.to_owned()))
    }

    /// Lists visible roles, system roles first then alphabetically.
    pub async fn list_roles(
        &self,
        context: TenantContext,
        filter: RoleListFilter,
    ) -> RbacResult<Vec<Role>> {
        self.repository.list_roles(context, &filter).await
    }

    /// Lists the permission catalog ordered by code.
    pub async fn list_permissions(&self, filter: PermissionFilter) -> RbacResult<Vec<Permission>> {
        self.permission_registry.list_all(filter).await
    }

    /// Updates name and description.
    pub async fn update_role(
        &self,
        context: TenantContext,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> RbacResult<Role> {
        let role = self.get_role(context, role_id).await?;
        ensure_writable(context, &role)?;

        let name = match input.name {
            Some(name) => RoleName::new(name)?,
            None => role.name().clone(),
        };

        if &name != role.name()
            && self
                .repository
                .role_name_taken(role.scope(), &name, Some(role_id))
                .await?
        {
            return Err(RbacError::RoleNameExists(name.to_string()));
        }

        self.repository
            .update_role_details(
                role_id,
                RoleDetailsUpdate {
                    scope: role.scope(),
                    name,
                    description: input
                        .description
                        .unwrap_or_else(|| role.description().to_owned()),
                },
            )
            .await?;

        self.reload(context, role_id).await
    }

    /// Deletes an unassigned custom role and its grants.
    pub async fn delete_role(&self, context: TenantContext, role_id: RoleId) -> RbacResult<()> {
        let role = self.get_role(context, role_id).await?;

        if role.is_system() {
            return Err(RbacError::CannotDeleteSystem(role.name().to_string()));
        }
        ensure_writable(context, &role)?;

        if self.repository.count_role_assignments(role_id).await? > 0 {
            return Err(RbacError::RoleInUse(role.name().to_string()));
        }

        self.repository.delete_role(role_id).await?;

        info!(%role_id, role_name = %role.name(), "role deleted");
        Ok(())
    }

    /// Resolves permission ids, failing when any id is unknown.
    async fn resolve_permissions(&self, ids: &[PermissionId]) -> RbacResult<Vec<Permission>> {
        let requested: BTreeSet<PermissionId> = ids.iter().copied().collect();
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let requested_ids: Vec<PermissionId> = requested.iter().copied().collect();
        let permissions = self.permission_registry.resolve(&requested_ids).await?;

        if permissions.len() != requested.len() {
            let found: BTreeSet<PermissionId> = permissions.iter().map(Permission::id).collect();
            let missing = requested
                .difference(&found)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(RbacError::PermissionNotFound(missing));
        }

        Ok(permissions)
    }

    async fn reload(&self, context: TenantContext, role_id: RoleId) -> RbacResult<Role> {
        self.repository
            .find_role(context, role_id)
            .await?
            .ok_or_else(|| {
                RbacError::Internal(format!("role '{role_id}' disappeared after write"))
            })
    }
}

fn ensure_writable(context: TenantContext, role: &Role) -> RbacResult<()> {
    if context.can_write(role.scope()) {
        return Ok(());
    }

    Err(RbacError::AccessDenied(format!(
        "role '{}' is read-only in this tenant",
        role.name()
    )))
}
