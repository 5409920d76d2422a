use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use scholaris_application::{
    NewRole, PermissionFilter, PermissionRegistry, RoleDetailsUpdate, RoleListFilter,
    RoleRepository, UserRoleRepository,
};
use scholaris_core::{RbacError, RbacResult, Scope, TenantContext};
use scholaris_domain::{
    Permission, PermissionCode, PermissionId, Role, RoleId, RoleName, UserAccount, UserId,
};


#[derive(Debug, Clone)]
struct RoleRecord {
    scope: Scope,
    name: RoleName,
    description: String,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RbacState {
    permissions: HashMap<PermissionId, PermissionCode>,
    roles: HashMap<RoleId, RoleRecord>,
    role_permissions: BTreeSet<(RoleId, PermissionId)>,
    users: HashMap<UserId, UserAccount>,
    user_roles: BTreeSet<(UserId, RoleId)>,
}

impl RbacState {
    fn materialize(&self, role_id: RoleId, record: &RoleRecord) -> Role {
        let permissions = self
            .role_permissions
            .iter()
            .filter(|(granted_role, _)| *granted_role == role_id)
            .filter_map(|(_, permission_id)| {
                self.permissions
                    .get(permission_id)
                    .map(|code| Permission::new(*permission_id, *code))
            })
            .collect();

        Role::new(
            role_id,
            record.scope,
            record.name.clone(),
            record.description.clone(),
            record.is_system,
            permissions,
        )
        .with_timestamps(record.created_at, record.updated_at)
    }

    fn visible_role(&self, context: TenantContext, role_id: RoleId) -> Option<Role> {
        self.roles
            .get(&role_id)
            .filter(|record| context.can_see(record.scope))
            .map(|record| self.materialize(role_id, record))
    }

    fn name_taken(&self, scope: Scope, name: &RoleName, exclude: Option<RoleId>) -> bool {
        self.roles.iter().any(|(role_id, record)| {
            Some(*role_id) != exclude
                && &record.name == name
                && (scope.is_global() || record.scope == scope || record.scope.is_global())
        })
    }

    fn require_roles(&self, role_ids: &[RoleId]) -> RbacResult<()> {
        match role_ids
            .iter()
            .find(|role_id| !self.roles.contains_key(role_id))
        {
            Some(missing) => Err(RbacError::RoleNotFound(missing.to_string())),
            None => Ok(()),
        }
    }

    fn require_permissions(&self, permission_ids: &[PermissionId]) -> RbacResult<()> {
        match permission_ids
            .iter()
            .find(|permission_id| !self.permissions.contains_key(permission_id))
        {
            Some(missing) => Err(RbacError::PermissionNotFound(missing.to_string())),
            None => Ok(()),
        }
    }

    fn touch(&mut self, role_id: RoleId) {
        if let Some(record) = self.roles.get_mut(&role_id) {
            record.updated_at = Utc::now();
        }
    }
}

/// In-memory RBAC store implementing every repository port.
///
/// A single lock guards all tables so each call is atomic, mirroring one
/// database transaction per write.
#[derive(Debug, Default)]
pub struct InMemoryRbacStore {
    state: RwLock<RbacState>,
}

impl InMemoryRbacStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user projection, replacing any previous one with the same id.
    pub async fn insert_user(&self, user: UserAccount) {
        self.state.write().await.users.insert(user.id(), user);
    }
}

#[async_trait]
impl PermissionRegistry for InMemoryRbacStore {
    async fn resolve(&self, ids: &[PermissionId]) -> RbacResult<Vec<Permission>> {
        let state = self.state.read().await;
        let unique: BTreeSet<PermissionId> = ids.iter().copied().collect();

        Ok(unique
            .into_iter()
            .filter_map(|permission_id| {
                state
                    .permissions
                    .get(&permission_id)
                    .map(|code| Permission::new(permission_id, *code))
            })
            .collect())
    }

    async fn list_all(&self, filter: PermissionFilter) -> RbacResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state
            .permissions
            .iter()
            .map(|(permission_id, code)| Permission::new(*permission_id, *code))
            .filter(|permission| filter.matches(permission))
            .collect();
        permissions.sort_by_key(|permission| permission.code().as_str());

        Ok(permissions)
    }

    async fn ensure_catalog(&self, codes: &[PermissionCode]) -> RbacResult<Vec<Permission>> {
        let mut state = self.state.write().await;

        for code in codes {
            if !state.permissions.values().any(|stored| stored == code) {
                state.permissions.insert(PermissionId::new(), *code);
            }
        }

        let mut permissions: Vec<Permission> = state
            .permissions
            .iter()
            .filter(|(_, code)| codes.contains(*code))
            .map(|(permission_id, code)| Permission::new(*permission_id, *code))
            .collect();
        permissions.sort_by_key(|permission| permission.code().as_str());

        Ok(permissions)
    }
}

#[async_trait]
impl RoleRepository for InMemoryRbacStore {
    async fn find_role(&self, context: TenantContext, role_id: RoleId) -> RbacResult<Option<Role>> {
        Ok(self.state.read().await.visible_role(context, role_id))
    }

    async fn find_roles(
        &self,
        context: TenantContext,
        role_ids: &[RoleId],
    ) -> RbacResult<Vec<Role>> {
        let state = self.state.read().await;
        let unique: BTreeSet<RoleId> = role_ids.iter().copied().collect();

        Ok(unique
            .into_iter()
            .filter_map(|role_id| state.visible_role(context, role_id))
            .collect())
    }

    async fn find_role_by_name(
        &self,
        context: TenantContext,
        scope: Scope,
        name: &str,
    ) -> RbacResult<Option<Role>> {
        let state = self.state.read().await;
        let mut candidates: Vec<(RoleId, &RoleRecord)> = state
            .roles
            .iter()
            .filter(|(_, record)| {
                record.name.as_str() == name
                    && (record.scope == scope || record.scope.is_global())
                    && context.can_see(record.scope)
            })
            .map(|(role_id, record)| (*role_id, record))
            .collect();
        // A scoped match wins over the global one.
        candidates.sort_by_key(|(_, record)| record.scope.is_global());

        Ok(candidates
            .first()
            .map(|(role_id, record)| state.materialize(*role_id, record)))
    }

    async fn role_name_taken(
        &self,
        scope: Scope,
        name: &RoleName,
        exclude: Option<RoleId>,
    ) -> RbacResult<bool> {
        Ok(self.state.read().await.name_taken(scope, name, exclude))
    }

    async fn list_roles(
        &self,
        context: TenantContext,
        filter: &RoleListFilter,
    ) -> RbacResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .roles
            .iter()
            .filter(|(_, record)| context.can_see(record.scope))
            .map(|(role_id, record)| state.materialize(*role_id, record))
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
        let mut state = self.state.write().await;

        if state.name_taken(role.scope, &role.name, None) {
            return Err(RbacError::RoleNameExists(role.name.to_string()));
        }
        state.require_permissions(&role.permission_ids)?;

        let role_id = RoleId::new();
        let now = Utc::now();
        state.roles.insert(
            role_id,
            RoleRecord {
                scope: role.scope,
                name: role.name,
                description: role.description,
                is_system: role.is_system,
                created_at: now,
                updated_at: now,
            },
        );
        for permission_id in role.permission_ids {
            state.role_permissions.insert((role_id, permission_id));
        }

        Ok(role_id)
    }

    async fn update_role_details(
        &self,
        role_id: RoleId,
        update: RoleDetailsUpdate,
    ) -> RbacResult<()> {
        let mut state = self.state.write().await;

        if state.name_taken(update.scope, &update.name, Some(role_id)) {
            return Err(RbacError::RoleNameExists(update.name.to_string()));
        }

        let record = state
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| RbacError::RoleNotFound(role_id.to_string()))?;
        record.name = update.name;
        record.description = update.description;
        record.updated_at = Utc::now();

        Ok(())
    }

    async fn count_role_assignments(&self, role_id: RoleId) -> RbacResult<u64> {
        let count = self
            .state
            .read()
            .await
            .user_roles
            .iter()
            .filter(|(_, assigned_role)| *assigned_role == role_id)
            .count();

        u64::try_from(count)
            .map_err(|error| RbacError::Internal(format!("failed to count assignments: {error}")))
    }

    async fn delete_role(&self, role_id: RoleId) -> RbacResult<()> {
        let mut state = self.state.write().await;

        if !state.roles.contains_key(&role_id) {
            return Err(RbacError::RoleNotFound(role_id.to_string()));
        }
        if state
            .user_roles
            .iter()
            .any(|(_, assigned_role)| *assigned_role == role_id)
        {
            return Err(RbacError::RoleInUse(role_id.to_string()));
        }

        state.roles.remove(&role_id);
        state
            .role_permissions
            .retain(|(granted_role, _)| *granted_role != role_id);

        Ok(())
    }

    async fn append_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        let mut state = self.state.write().await;
        state.require_roles(&[role_id])?;
        state.require_permissions(permission_ids)?;

        for permission_id in permission_ids {
            state.role_permissions.insert((role_id, *permission_id));
        }
        state.touch(role_id);

        Ok(())
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        let mut state = self.state.write().await;
        state.require_roles(&[role_id])?;
        state.require_permissions(permission_ids)?;

        state
            .role_permissions
            .retain(|(granted_role, _)| *granted_role != role_id);
        for permission_id in permission_ids {
            state.role_permissions.insert((role_id, *permission_id));
        }
        state.touch(role_id);

        Ok(())
    }

    async fn remove_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        let mut state = self.state.write().await;
        state.role_permissions.retain(|(granted_role, permission_id)| {
            *granted_role != role_id || !permission_ids.contains(permission_id)
        });
        state.touch(role_id);

        Ok(())
    }
}

#[async_trait]
impl UserRoleRepository for InMemoryRbacStore {
    async fn find_user(
        &self,
        context: TenantContext,
        user_id: UserId,
    ) -> RbacResult<Option<UserAccount>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .get(&user_id)
            .filter(|user| context.can_write(user.scope()))
            .cloned())
    }

    async fn list_user_roles(&self, user_id: UserId) -> RbacResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state
            .user_roles
            .iter()
            .filter(|(assigned_user, _)| *assigned_user == user_id)
            .filter_map(|(_, role_id)| state.visible_role(TenantContext::Platform, *role_id))
            .collect();
        roles.sort_by(|left, right| left.name().cmp(right.name()));

        Ok(roles)
    }

    async fn append_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        let mut state = self.state.write().await;
        state.require_roles(role_ids)?;

        for role_id in role_ids {
            state.user_roles.insert((user_id, *role_id));
        }

        Ok(())
    }

    async fn replace_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        let mut state = self.state.write().await;
        state.require_roles(role_ids)?;

        state
            .user_roles
            .retain(|(assigned_user, _)| *assigned_user != user_id);
        for role_id in role_ids {
            state.user_roles.insert((user_id, *role_id));
        }

        Ok(())
    }

    async fn remove_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        self.state
            .write()
            .await
            .user_roles
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
        let state = self.state.read().await;
        let mut users: Vec<UserAccount> = state
            .user_roles
            .iter()
            .filter(|(_, assigned_role)| *assigned_role == role_id)
            .filter_map(|(user_id, _)| state.users.get(user_id))
            .filter(|user| context.can_write(user.scope()))
            .cloned()
            .collect();
        users.sort_by(|left, right| left.display_name().cmp(right.display_name()));

        Ok(users)
    }
}
