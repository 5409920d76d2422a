use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use scholaris_application::{NewRole, RoleDetailsUpdate, RoleListFilter, RoleRepository};
use scholaris_core::{RbacError, RbacResult, Scope, TenantContext};
use scholaris_domain::{PermissionId, Role, RoleId, RoleName};

use crate::postgres_rbac_rows::{
    FOREIGN_KEY_VIOLATION, ROLE_SELECT, ROLE_VISIBILITY, RoleRow, UNIQUE_VIOLATION,
    aggregate_roles, context_tenant, map_database_error, permission_uuids, role_uuids,
};

mod grants;


/// PostgreSQL-backed repository for roles and their grants.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> RbacResult<sqlx::Transaction<'_, sqlx::Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|error| RbacError::Internal(format!("failed to begin transaction: {error}")))
    }
}

async fn commit(transaction: sqlx::Transaction<'_, sqlx::Postgres>) -> RbacResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| RbacError::Internal(format!("failed to commit transaction: {error}")))
}

/// Serializes writers of the same role name until the transaction ends.
async fn lock_role_name(connection: &mut PgConnection, name: &RoleName) -> RbacResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(name.as_str())
        .execute(connection)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to lock role name: {error}")))?;

    Ok(())
}

/// Tenant scopes collide with their own roles and with global ones. The global
/// scope collides with a role of that name in any tenant.
async fn name_taken(
    connection: &mut PgConnection,
    scope: Scope,
    name: &RoleName,
    exclude: Option<RoleId>,
) -> RbacResult<bool> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM roles
            WHERE name = $1
                AND ($2::uuid IS NULL OR tenant_id IS NULL OR tenant_id = $2)
                AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(name.as_str())
    .bind(scope.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
    .bind(exclude.map(|role_id| role_id.as_uuid()))
    .fetch_one(connection)
    .await
    .map_err(|error| RbacError::Internal(format!("failed to check role name: {error}")))
}

async fn insert_grants(
    connection: &mut PgConnection,
    role_id: Uuid,
    permission_ids: &[PermissionId],
) -> RbacResult<()> {
    if permission_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO role_permissions (role_id, permission_id)
        SELECT $1, requested.permission_id
        FROM UNNEST($2::uuid[]) AS requested(permission_id)
        ON CONFLICT (role_id, permission_id) DO NOTHING
        "#,
    )
    .bind(role_id)
    .bind(permission_uuids(permission_ids))
    .execute(connection)
    .await
    .map_err(|error| {
        map_database_error(
            error,
            FOREIGN_KEY_VIOLATION,
            RbacError::PermissionNotFound(
                permission_ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            "persist role grants",
        )
    })?;

    Ok(())
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn find_role(&self, context: TenantContext, role_id: RoleId) -> RbacResult<Option<Role>> {
        Ok(self
            .find_roles(context, &[role_id])
            .await?
            .into_iter()
            .next())
    }

    async fn find_roles(
        &self,
        context: TenantContext,
        role_ids: &[RoleId],
    ) -> RbacResult<Vec<Role>> {
        let query = format!(
            "{ROLE_SELECT} WHERE {ROLE_VISIBILITY} AND roles.id = ANY($2) \
             ORDER BY roles.name, permissions.code"
        );
        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .bind(context_tenant(context))
            .bind(role_uuids(role_ids))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| RbacError::Internal(format!("failed to load roles: {error}")))?;

        aggregate_roles(rows)
    }

    async fn find_role_by_name(
        &self,
        context: TenantContext,
        scope: Scope,
        name: &str,
    ) -> RbacResult<Option<Role>> {
        // A scoped match sorts ahead of the global one.
        let query = format!(
            "{ROLE_SELECT} WHERE {ROLE_VISIBILITY} AND roles.name = $2 \
             AND (roles.tenant_id IS NULL OR roles.tenant_id = $3) \
             ORDER BY roles.tenant_id IS NULL, permissions.code"
        );
        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .bind(context_tenant(context))
            .bind(name)
            .bind(scope.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
            .fetch_all(&self.pool)
            .await
            .map_err(|error| RbacError::Internal(format!("failed to find role by name: {error}")))?;

        Ok(aggregate_roles(rows)?.into_iter().next())
    }

    async fn role_name_taken(
        &self,
        scope: Scope,
        name: &RoleName,
        exclude: Option<RoleId>,
    ) -> RbacResult<bool> {
        let mut connection = self.pool.acquire().await.map_err(|error| {
            RbacError::Internal(format!("failed to acquire connection: {error}"))
        })?;

        name_taken(&mut connection, scope, name, exclude).await
    }

    async fn list_roles(
        &self,
        context: TenantContext,
        filter: &RoleListFilter,
    ) -> RbacResult<Vec<Role>> {
        let query = format!(
            "{ROLE_SELECT} WHERE {ROLE_VISIBILITY} \
             AND ($2::uuid IS NULL OR roles.tenant_id IS NULL OR roles.tenant_id = $2) \
             AND ($3 OR NOT roles.is_system) \
             AND ($4::text IS NULL \
                 OR strpos(lower(roles.name), lower($4)) > 0 \
                 OR strpos(lower(roles.description), lower($4)) > 0) \
             ORDER BY roles.is_system DESC, roles.name, permissions.code"
        );
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty());

        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .bind(context_tenant(context))
            .bind(filter.tenant_id.map(|tenant_id| tenant_id.as_uuid()))
            .bind(filter.include_system)
            .bind(search)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| RbacError::Internal(format!("failed to list roles: {error}")))?;

        aggregate_roles(rows)
    }

    async fn insert_role(&self, role: NewRole) -> RbacResult<RoleId> {
        let mut transaction = self.begin().await?;

        lock_role_name(&mut transaction, &role.name).await?;
        if name_taken(&mut transaction, role.scope, &role.name, None).await? {
            return Err(RbacError::RoleNameExists(role.name.to_string()));
        }

        let role_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO roles (tenant_id, name, description, is_system)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(role.scope.tenant_id().map(|tenant_id| tenant_id.as_uuid()))
        .bind(role.name.as_str())
        .bind(role.description.as_str())
        .bind(role.is_system)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            map_database_error(
                error,
                UNIQUE_VIOLATION,
                RbacError::RoleNameExists(role.name.to_string()),
                "create role",
            )
        })?;

        insert_grants(&mut transaction, role_id, &role.permission_ids).await?;
        commit(transaction).await?;

        Ok(RoleId::from_uuid(role_id))
    }

    async fn update_role_details(
        &self,
        role_id: RoleId,
        update: RoleDetailsUpdate,
    ) -> RbacResult<()> {
        let mut transaction = self.begin().await?;

        lock_role_name(&mut transaction, &update.name).await?;
        if name_taken(&mut transaction, update.scope, &update.name, Some(role_id)).await? {
            return Err(RbacError::RoleNameExists(update.name.to_string()));
        }

        let rows_affected = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, description = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(update.name.as_str())
        .bind(update.description.as_str())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_database_error(
                error,
                UNIQUE_VIOLATION,
                RbacError::RoleNameExists(update.name.to_string()),
                "update role",
            )
        })?
        .rows_affected();

        if rows_affected == 0 {
            return Err(RbacError::RoleNotFound(role_id.to_string()));
        }

        commit(transaction).await
    }

    async fn count_role_assignments(&self, role_id: RoleId) -> RbacResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_roles
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to count assignments: {error}")))?;

        u64::try_from(count)
            .map_err(|error| RbacError::Internal(format!("invalid assignment count: {error}")))
    }

    async fn delete_role(&self, role_id: RoleId) -> RbacResult<()> {
        let mut transaction = self.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| RbacError::Internal(format!("failed to clear role grants: {error}")))?;

        let rows_affected = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                map_database_error(
                    error,
                    FOREIGN_KEY_VIOLATION,
                    RbacError::RoleInUse(role_id.to_string()),
                    "delete role",
                )
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(RbacError::RoleNotFound(role_id.to_string()));
        }

        commit(transaction).await
    }

    async fn append_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        self.write_grants(role_id, grants::GrantWrite::Append, permission_ids)
            .await
    }

    async fn replace_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        self.write_grants(role_id, grants::GrantWrite::Replace, permission_ids)
            .await
    }

    async fn remove_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        self.write_grants(role_id, grants::GrantWrite::Remove, permission_ids)
            .await
    }
}
