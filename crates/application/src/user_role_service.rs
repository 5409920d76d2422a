use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use scholaris_core::{RbacError, RbacResult, TenantContext};
use scholaris_domain::{Permission, PermissionCode, Role, RoleId, UserAccount, UserId};
use tracing::{debug, info};

use crate::{RoleRepository, UserRoleRepository};


/// Application service binding users to roles and deriving effective permissions.
#[derive(Clone)]
pub struct UserRoleService {
    role_repository: Arc<dyn RoleRepository>,
    repository: Arc<dyn UserRoleRepository>,
}

impl UserRoleService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        role_repository: Arc<dyn RoleRepository>,
        repository: Arc<dyn UserRoleRepository>,
    ) -> Self {
        Self {
            role_repository,
            repository,
        }
    }

    /// Returns the roles held by a user with permissions populated.
    pub async fn get_user_roles(
        &self,
        context: TenantContext,
        user_id: UserId,
    ) -> RbacResult<Vec<Role>> {
        self.load_user(context, user_id).await?;
        self.repository.list_user_roles(user_id).await
    }

    /// Adds roles to a user after validating every role against the user's tenant.
    ///
    /// Under a tenant context another tenant's roles are invisible, so they fail
    /// as [`RbacError::RoleNotFound`]. [`RbacError::TenantMismatch`] is only
    /// returned to callers that can see the role, i.e. the platform context.
    pub async fn assign_roles(
        &self,
        context: TenantContext,
        user_id: UserId,
        role_ids: Vec<RoleId>,
    ) -> RbacResult<Vec<Role>> {
        let user = self.load_user(context, user_id).await?;
        let roles = self.resolve_assignable_roles(context, &user, &role_ids).await?;
        let ids: Vec<RoleId> = roles.iter().map(Role::id).collect();

        self.repository.append_user_roles(user_id, &ids).await?;

        info!(%user_id, count = ids.len(), "roles assigned to user");
        self.repository.list_user_roles(user_id).await
    }

    /// Removes any of the given roles currently held by the user.
    pub async fn remove_roles(
        &self,
        context: TenantContext,
        user_id: UserId,
        role_ids: Vec<RoleId>,
    ) -> RbacResult<Vec<Role>> {
        self.load_user(context, user_id).await?;

        self.repository.remove_user_roles(user_id, &role_ids).await?;

        info!(%user_id, count = role_ids.len(), "roles removed from user");
        self.repository.list_user_roles(user_id).await
    }

    /// Replaces every role of the user after the same validation as `assign_roles`,
    /// with the same `RoleNotFound` outcome for foreign roles under a tenant context.
    pub async fn set_roles(
        &self,
        context: TenantContext,
        user_id: UserId,
        role_ids: Vec<RoleId>,
    ) -> RbacResult<Vec<Role>> {
        let user = self.load_user(context, user_id).await?;
        let roles = self.resolve_assignable_roles(context, &user, &role_ids).await?;
        let ids: Vec<RoleId> = roles.iter().map(Role::id).collect();

        self.repository.replace_user_roles(user_id, &ids).await?;

        info!(%user_id, count = ids.len(), "user roles replaced");
        self.repository.list_user_roles(user_id).await
    }

    /// Returns whether the user holds a role with this name.
    pub async fn has_role(
        &self,
        context: TenantContext,
        user_id: UserId,
        role_name: &str,
    ) -> RbacResult<bool> {
        let roles = self.get_user_roles(context, user_id).await?;
        Ok(roles.iter().any(|role| role.name().as_str() == role_name))
    }

    /// Returns whether any role held by the user grants the permission.
    pub async fn has_permission(
        &self,
        context: TenantContext,
        user_id: UserId,
        code: PermissionCode,
    ) -> RbacResult<bool> {
        let roles = self.get_user_roles(context, user_id).await?;
        Ok(roles.iter().any(|role| role.grants(code)))
    }

    /// Returns the union of permissions over every role the user holds.
    pub async fn get_user_permissions(
        &self,
        context: TenantContext,
        user_id: UserId,
    ) -> RbacResult<Vec<Permission>> {
        let roles = self.get_user_roles(context, user_id).await?;
        let mut seen = HashSet::new();

        Ok(roles
            .iter()
            .flat_map(Role::permissions)
            .filter(|permission| seen.insert(permission.id()))
            .cloned()
            .collect())
    }

    /// Returns the codes of the user's effective permissions, sorted.
    pub async fn get_user_permission_codes(
        &self,
        context: TenantContext,
        user_id: UserId,
    ) -> RbacResult<Vec<PermissionCode>> {
        let codes: BTreeSet<PermissionCode> = self
            .get_user_permissions(context, user_id)
            .await?
            .iter()
            .map(Permission::code)
            .collect();

        Ok(codes.into_iter().collect())
    }

    /// Returns the visible users holding a role.
    pub async fn get_users_with_role(
        &self,
        context: TenantContext,
        role_id: RoleId,
    ) -> RbacResult<Vec<UserAccount>> {
        if self
            .role_repository
            .find_role(context, role_id)
            .await?
            .is_none()
        {
            return Err(RbacError::RoleNotFound(role_id.to_string()));
        }

        self.repository.list_users_with_role(context, role_id).await
    }

    async fn load_user(&self, context: TenantContext, user_id: UserId) -> RbacResult<UserAccount> {
        self.repository
            .find_user(context, user_id)
            .await?
            .ok_or_else(|| RbacError::UserNotFound(user_id.to_string()))
    }

    /// Resolves every requested role and checks tenant membership before any write.
    async fn resolve_assignable_roles(
        &self,
        context: TenantContext,
        user: &UserAccount,
        role_ids: &[RoleId],
    ) -> RbacResult<Vec<Role>> {
        let requested: BTreeSet<RoleId> = role_ids.iter().copied().collect();
        let requested_ids: Vec<RoleId> = requested.iter().copied().collect();
        let roles = self
            .role_repository
            .find_roles(context, &requested_ids)
            .await?;

        if roles.len() != requested.len() {
            let found: BTreeSet<RoleId> = roles.iter().map(Role::id).collect();
            let missing = requested
                .difference(&found)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(RbacError::RoleNotFound(missing));
        }

        if let Some(role) = roles.iter().find(|role| !role.scope().admits(user.scope())) {
            debug!(
                user_id = %user.id(),
                role_id = %role.id(),
                "rejected cross-tenant role assignment"
            );
            return Err(RbacError::TenantMismatch {
                role: role.name().to_string(),
                user: user.id().to_string(),
            });
        }

        Ok(roles)
    }
}
