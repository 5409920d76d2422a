use std::sync::Arc;

use scholaris_core::{RbacError, RbacResult, TenantContext};
use scholaris_domain::{PermissionCode, Role, RoleHierarchy, RoleId, UserId};
use tracing::warn;

use crate::{RoleRepository, UserRoleService};

/// Answers permission checks and delegation decisions for callers.
#[derive(Clone)]
pub struct AuthorizationService {
    user_roles: UserRoleService,
    role_repository: Arc<dyn RoleRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(user_roles: UserRoleService, role_repository: Arc<dyn RoleRepository>) -> Self {
        Self {
            user_roles,
            role_repository,
        }
    }

    /// Returns whether the user currently has the permission.
    pub async fn has_permission(
        &self,
        context: TenantContext,
        user_id: UserId,
        code: PermissionCode,
    ) -> RbacResult<bool> {
        self.user_roles.has_permission(context, user_id, code).await
    }

    /// Ensures the user has the permission.
    pub async fn require_permission(
        &self,
        context: TenantContext,
        user_id: UserId,
        code: PermissionCode,
    ) -> RbacResult<()> {
        if self.has_permission(context, user_id, code).await? {
            return Ok(());
        }

        Err(RbacError::AccessDenied(format!(
            "user '{user_id}' is missing permission '{code}'"
        )))
    }

    /// Returns whether the user holds a role with this name.
    pub async fn has_role(
        &self,
        context: TenantContext,
        user_id: UserId,
        role_name: &str,
    ) -> RbacResult<bool> {
        self.user_roles.has_role(context, user_id, role_name).await
    }

    /// Returns whether a holder of `source` may grant `target`.
    #[must_use]
    pub fn can_assign(&self, source: &Role, target: &Role) -> bool {
        RoleHierarchy::can_assign(source, target)
    }

    /// Returns whether the actor's most privileged role can grant every target role.
    ///
    /// Actors without roles can grant nothing.
    pub async fn can_assign_roles(
        &self,
        context: TenantContext,
        actor_id: UserId,
        role_ids: &[RoleId],
    ) -> RbacResult<bool> {
        let actor_roles = self.user_roles.get_user_roles(context, actor_id).await?;
        let Some(strongest) = actor_roles
            .iter()
            .min_by_key(|role| RoleHierarchy::level_of(role))
        else {
            return Ok(false);
        };

        let targets = self.role_repository.find_roles(context, role_ids).await?;
        if let Some(missing) = role_ids
            .iter()
            .find(|role_id| !targets.iter().any(|role| role.id() == **role_id))
        {
            return Err(RbacError::RoleNotFound(missing.to_string()));
        }

        Ok(targets
            .iter()
            .all(|target| RoleHierarchy::can_assign(strongest, target)))
    }

    /// Ensures the actor may grant every target role.
    pub async fn require_role_assignment(
        &self,
        context: TenantContext,
        actor_id: UserId,
        role_ids: &[RoleId],
    ) -> RbacResult<()> {
        if self.can_assign_roles(context, actor_id, role_ids).await? {
            return Ok(());
        }

        warn!(%actor_id, requested = role_ids.len(), "role delegation rejected by hierarchy");
        Err(RbacError::AccessDenied(format!(
            "user '{actor_id}' cannot assign roles more privileged than their own"
        )))
    }
}
