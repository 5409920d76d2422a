use async_trait::async_trait;

use scholaris_core::{RbacResult, TenantContext};
use scholaris_domain::{Role, RoleId, UserAccount, UserId};

/// Repository port for user-role assignments.
#[async_trait]
pub trait UserRoleRepository: Send + Sync {
    /// Finds a user owned by the caller's context.
    async fn find_user(
        &self,
        context: TenantContext,
        user_id: UserId,
    ) -> RbacResult<Option<UserAccount>>;

    /// Lists roles held by the user with permissions populated, ordered by name.
    async fn list_user_roles(&self, user_id: UserId) -> RbacResult<Vec<Role>>;

    /// Adds assignments, ignoring ones already held.
    ///
    /// Fails `RoleNotFound` if a role vanished after validation.
    async fn append_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()>;

    /// Replaces every assignment of the user.
    ///
    /// Fails `RoleNotFound` if a role vanished after validation.
    async fn replace_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()>;

    /// Removes assignments, ignoring ones not held.
    async fn remove_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()>;

    /// Lists visible users holding the role, ordered by display name.
    async fn list_users_with_role(
        &self,
        context: TenantContext,
        role_id: RoleId,
    ) -> RbacResult<Vec<UserAccount>>;
}
