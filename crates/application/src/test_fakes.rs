use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use scholaris_core::{RbacError, RbacResult, Scope, TenantContext};
use scholaris_domain::{
    Permission, PermissionCode, PermissionId, Role, RoleId, RoleName, UserAccount, UserId,
    system_role_seeds,
};

use crate::{
    NewRole, PermissionFilter, PermissionRegistry, RoleDetailsUpdate, RoleListFilter,
    RoleRepository, UserRoleRepository,
};

#[derive(Debug, Clone)]
struct StoredRole {
    scope: Scope,
    name: RoleName,
    description: String,
    is_system: bool,
    permission_ids: Vec<PermissionId>,
}

#[derive(Default)]
struct State {
    permissions: Vec<Permission>,
    roles: HashMap<RoleId, StoredRole>,
    users: HashMap<UserId, UserAccount>,
    assignments: Vec<(UserId, RoleId)>,
}

impl State {
    fn materialize(&self, role_id: RoleId, stored: &StoredRole) -> Role {
        let permissions = self
            .permissions
            .iter()
            .filter(|permission| stored.permission_ids.contains(&permission.id()))
            .cloned()
            .collect();
        Role::new(
            role_id,
            stored.scope,
            stored.name.clone(),
            stored.description.clone(),
            stored.is_system,
            permissions,
        )
    }

    fn visible_role(&self, context: TenantContext, role_id: RoleId) -> Option<Role> {
        self.roles
            .get(&role_id)
            .filter(|stored| context.can_see(stored.scope))
            .map(|stored| self.materialize(role_id, stored))
    }
}

/// Minimal store used by service tests.
#[derive(Default)]
pub struct FakeRbacStore {
    state: Mutex<State>,
    pub writes: Mutex<usize>,
}

impl FakeRbacStore {
    pub async fn with_system_roles() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().await;
            state.permissions = PermissionCode::all()
                .iter()
                .map(|code| Permission::new(PermissionId::new(), *code))
                .collect();
            for seed in system_role_seeds() {
                let permission_ids = state
                    .permissions
                    .iter()
                    .filter(|permission| seed.permissions.contains(&permission.code()))
                    .map(Permission::id)
                    .collect();
                state.roles.insert(
                    RoleId::new(),
                    StoredRole {
                        scope: Scope::Global,
                        name: RoleName::new(seed.name()).unwrap_or_else(|_| unreachable!()),
                        description: seed.description.to_owned(),
                        is_system: true,
                        permission_ids,
                    },
                );
            }
        }
        store
    }

    pub async fn permission_id(&self, code: PermissionCode) -> PermissionId {
        self.state
            .lock()
            .await
            .permissions
            .iter()
            .find(|permission| permission.code() == code)
            .map(Permission::id)
            .unwrap_or_else(|| unreachable!())
    }

    pub async fn system_role_id(&self, name: &str) -> RoleId {
        self.state
            .lock()
            .await
            .roles
            .iter()
            .find(|(_, stored)| stored.is_system && stored.name.as_str() == name)
            .map(|(role_id, _)| *role_id)
            .unwrap_or_else(|| unreachable!())
    }

    pub async fn add_user(&self, user: UserAccount) {
        self.state.lock().await.users.insert(user.id(), user);
    }

    pub async fn grant_role(&self, user_id: UserId, role_id: RoleId) {
        self.state.lock().await.assignments.push((user_id, role_id));
    }

    pub async fn role_count(&self) -> usize {
        self.state.lock().await.roles.len()
    }

    async fn record_write(&self) {
        *self.writes.lock().await += 1;
    }
}

#[async_trait]
impl PermissionRegistry for FakeRbacStore {
    async fn resolve(&self, ids: &[PermissionId]) -> RbacResult<Vec<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .filter(|permission| ids.contains(&permission.id()))
            .cloned()
            .collect())
    }

    async fn list_all(&self, filter: PermissionFilter) -> RbacResult<Vec<Permission>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .filter(|permission| filter.matches(permission))
            .cloned()
            .collect())
    }

    async fn ensure_catalog(&self, codes: &[PermissionCode]) -> RbacResult<Vec<Permission>> {
        let mut state = self.state.lock().await;
        for code in codes {
            if !state.permissions.iter().any(|permission| permission.code() == *code) {
                state.permissions.push(Permission::new(PermissionId::new(), *code));
            }
        }
        Ok(state
            .permissions
            .iter()
            .filter(|permission| codes.contains(&permission.code()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleRepository for FakeRbacStore {
    async fn find_role(&self, context: TenantContext, role_id: RoleId) -> RbacResult<Option<Role>> {
        Ok(self.state.lock().await.visible_role(context, role_id))
    }

    async fn find_roles(
        &self,
        context: TenantContext,
        role_ids: &[RoleId],
    ) -> RbacResult<Vec<Role>> {
        let state = self.state.lock().await;
        Ok(role_ids
            .iter()
            .filter_map(|role_id| state.visible_role(context, *role_id))
            .collect())
    }

    async fn find_role_by_name(
        &self,
        context: TenantContext,
        scope: Scope,
        name: &str,
    ) -> RbacResult<Option<Role>> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .iter()
            .find(|(_, stored)| {
                stored.name.as_str() == name
                    && (stored.scope == scope || stored.scope.is_global())
                    && context.can_see(stored.scope)
            })
            .map(|(role_id, stored)| state.materialize(*role_id, stored)))
    }

    async fn role_name_taken(
        &self,
        scope: Scope,
        name: &RoleName,
        exclude: Option<RoleId>,
    ) -> RbacResult<bool> {
        Ok(self.state.lock().await.roles.iter().any(|(role_id, stored)| {
            Some(*role_id) != exclude
                && &stored.name == name
                && (scope.is_global() || stored.scope == scope || stored.scope.is_global())
        }))
    }

    async fn list_roles(
        &self,
        context: TenantContext,
        filter: &RoleListFilter,
    ) -> RbacResult<Vec<Role>> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state
            .roles
            .iter()
            .filter(|(_, stored)| context.can_see(stored.scope))
            .map(|(role_id, stored)| state.materialize(*role_id, stored))
            .filter(|role| filter.matches(role))
            .collect();
        roles.sort_by(|left, right| {
            right
                .is_system()
                .cmp(&left.is_system())
                .then_with(|| left.name().cmp(right.name()))
        });
        Ok(roles)
    }

    async fn insert_role(&self, role: NewRole) -> RbacResult<RoleId> {
        self.record_write().await;
        if self.role_name_taken(role.scope, &role.name, None).await? {
            return Err(RbacError::RoleNameExists(role.name.to_string()));
        }

        let role_id = RoleId::new();
        self.state.lock().await.roles.insert(
            role_id,
            StoredRole {
                scope: role.scope,
                name: role.name,
                description: role.description,
                is_system: role.is_system,
                permission_ids: role.permission_ids,
            },
        );
        Ok(role_id)
    }

    async fn update_role_details(
        &self,
        role_id: RoleId,
        update: RoleDetailsUpdate,
    ) -> RbacResult<()> {
        self.record_write().await;
        let mut state = self.state.lock().await;
        let stored = state
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| RbacError::RoleNotFound(role_id.to_string()))?;
        stored.name = update.name;
        stored.description = update.description;
        Ok(())
    }

    async fn count_role_assignments(&self, role_id: RoleId) -> RbacResult<u64> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|(_, assigned)| *assigned == role_id)
            .count() as u64)
    }

    async fn delete_role(&self, role_id: RoleId) -> RbacResult<()> {
        self.record_write().await;
        self.state.lock().await.roles.remove(&role_id);
        Ok(())
    }

    async fn append_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        self.record_write().await;
        let mut state = self.state.lock().await;
        if let Some(stored) = state.roles.get_mut(&role_id) {
            for permission_id in permission_ids {
                if !stored.permission_ids.contains(permission_id) {
                    stored.permission_ids.push(*permission_id);
                }
            }
        }
        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        self.record_write().await;
        if let Some(stored) = self.state.lock().await.roles.get_mut(&role_id) {
            stored.permission_ids = permission_ids.to_vec();
        }
        Ok(())
    }

    async fn remove_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        self.record_write().await;
        if let Some(stored) = self.state.lock().await.roles.get_mut(&role_id) {
            stored
                .permission_ids
                .retain(|permission_id| !permission_ids.contains(permission_id));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRoleRepository for FakeRbacStore {
    async fn find_user(
        &self,
        context: TenantContext,
        user_id: UserId,
    ) -> RbacResult<Option<UserAccount>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .get(&user_id)
            .filter(|user| context.can_write(user.scope()))
            .cloned())
    }

    async fn list_user_roles(&self, user_id: UserId) -> RbacResult<Vec<Role>> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state
            .assignments
            .iter()
            .filter(|(assigned_user, _)| *assigned_user == user_id)
            .filter_map(|(_, role_id)| state.visible_role(TenantContext::Platform, *role_id))
            .collect();
        roles.sort_by(|left, right| left.name().cmp(right.name()));
        Ok(roles)
    }

    async fn append_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        self.record_write().await;
        let mut state = self.state.lock().await;
        for role_id in role_ids {
            if !state.assignments.contains(&(user_id, *role_id)) {
                state.assignments.push((user_id, *role_id));
            }
        }
        Ok(())
    }

    async fn replace_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        self.record_write().await;
        let mut state = self.state.lock().await;
        state
            .assignments
            .retain(|(assigned_user, _)| *assigned_user != user_id);
        state
            .assignments
            .extend(role_ids.iter().map(|role_id| (user_id, *role_id)));
        Ok(())
    }

    async fn remove_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        self.record_write().await;
        self.state
            .lock()
            .await
            .assignments
            .retain(|(assigned_user, role_id)| {
                *assigned_user != user_id || !role_ids.contains(role_id)
            });
        Ok(())
    }

    async fn list_users_with_role(
        &self,
        context: TenantContext,
        role_id: RoleId,
    ) -> RbacResult<Vec<UserAccount>> {
        let state = self.state.lock().await;
        Ok(state
            .assignments
            .iter()
            .filter(|(_, assigned)| *assigned == role_id)
            .filter_map(|(user_id, _)| state.users.get(user_id))
            .filter(|user| context.can_write(user.scope()))
            .cloned()
            .collect())
    }
}
