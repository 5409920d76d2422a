use tracing::debug;

use super::*;

impl RoleService {
    /// Adds permissions to a custom role. Already-held permissions are ignored.
    pub async fn assign_permissions(
        &self,
        context: TenantContext,
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
    ) -> RbacResult<Role> {
        self.load_mutable_role(context, role_id).await?;
        let permissions = self.resolve_permissions(&permission_ids).await?;
        let ids: Vec<PermissionId> = permissions.iter().map(Permission::id).collect();

        self.repository.append_role_permissions(role_id, &ids).await?;

        debug!(%role_id, count = ids.len(), "role permissions appended");
        self.reload(context, role_id).await
    }

    /// Removes permissions from a custom role. Missing ones are ignored.
    pub async fn remove_permissions(
        &self,
        context: TenantContext,
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
    ) -> RbacResult<Role> {
        self.load_mutable_role(context, role_id).await?;

        self.repository
            .remove_role_permissions(role_id, &permission_ids)
            .await?;

        debug!(%role_id, count = permission_ids.len(), "role permissions removed");
        self.reload(context, role_id).await
    }

    /// Replaces every permission of a custom role.
    pub async fn set_permissions(
        &self,
        context: TenantContext,
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
    ) -> RbacResult<Role> {
        self.load_mutable_role(context, role_id).await?;
        let permissions = self.resolve_permissions(&permission_ids).await?;
        let ids: Vec<PermissionId> = permissions.iter().map(Permission::id).collect();

        self.repository.replace_role_permissions(role_id, &ids).await?;

        debug!(%role_id, count = ids.len(), "role permissions replaced");
        self.reload(context, role_id).await
    }

    async fn load_mutable_role(&self, context: TenantContext, role_id: RoleId) -> RbacResult<Role> {
        let role = self.get_role(context, role_id).await?;

        if role.is_system() {
            return Err(RbacError::CannotModifySystem(role.name().to_string()));
        }
        ensure_writable(context, &role)?;

        Ok(role)
    }
}
