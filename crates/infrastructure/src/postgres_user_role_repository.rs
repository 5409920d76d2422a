use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use scholaris_application::UserRoleRepository;
use scholaris_core::{RbacError, RbacResult, TenantContext};
use scholaris_domain::{Role, RoleId, UserAccount, UserId};
use tracing::warn;

use crate::postgres_rbac_rows::{
    FOREIGN_KEY_VIOLATION, ROLE_SELECT, RoleRow, UserRow, aggregate_roles, context_tenant,
    map_database_error, role_uuids,
};

/// PostgreSQL-backed repository for user-role assignments.
#[derive(Clone)]
pub struct PostgresUserRoleRepository {
    pool: PgPool,
}

impl PostgresUserRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_assignments(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
        replace: bool,
    ) -> RbacResult<()> {
        let role_ids = role_uuids(role_ids);
        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                RbacError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        lock_roles(&mut transaction, &role_ids).await?;

        if replace {
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(user_id.as_uuid())
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    RbacError::Internal(format!("failed to clear user roles: {error}"))
                })?;
        }

        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, requested.role_id
            FROM UNNEST($2::uuid[]) AS requested(role_id)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(&role_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            map_database_error(
                error,
                FOREIGN_KEY_VIOLATION,
                RbacError::UserNotFound(user_id.to_string()),
                "assign user roles",
            )
        })?;

        transaction.commit().await.map_err(|error| {
            RbacError::Internal(format!("failed to commit transaction: {error}"))
        })
    }
}

/// Share-locks the roles so a concurrent delete waits for this transaction,
/// and fails if any of them is already gone.
async fn lock_roles(connection: &mut PgConnection, role_ids: &[Uuid]) -> RbacResult<()> {
    let locked: BTreeSet<Uuid> = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM roles
        WHERE id = ANY($1)
        FOR SHARE
        "#,
    )
    .bind(role_ids)
    .fetch_all(connection)
    .await
    .map_err(|error| RbacError::Internal(format!("failed to lock roles: {error}")))?
    .into_iter()
    .collect();

    let missing: Vec<String> = role_ids
        .iter()
        .filter(|role_id| !locked.contains(role_id))
        .map(ToString::to_string)
        .collect();

    if !missing.is_empty() {
        warn!(missing = missing.len(), "roles vanished before assignment");
        return Err(RbacError::RoleNotFound(missing.join(", ")));
    }

    Ok(())
}

#[async_trait]
impl UserRoleRepository for PostgresUserRoleRepository {
    async fn find_user(
        &self,
        context: TenantContext,
        user_id: UserId,
    ) -> RbacResult<Option<UserAccount>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, tenant_id, email, display_name
            FROM users
            WHERE id = $1
                AND ($2::uuid IS NULL OR tenant_id = $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(context_tenant(context))
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to find user: {error}")))?;

        Ok(row.map(UserAccount::from))
    }

    async fn list_user_roles(&self, user_id: UserId) -> RbacResult<Vec<Role>> {
        let query = format!(
            "{ROLE_SELECT} WHERE roles.id IN (SELECT role_id FROM user_roles WHERE user_id = $1) \
             ORDER BY roles.name, permissions.code"
        );
        let rows = sqlx::query_as::<_, RoleRow>(query.as_str())
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|error| RbacError::Internal(format!("failed to list user roles: {error}")))?;

        aggregate_roles(rows)
    }

    async fn append_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        self.write_assignments(user_id, role_ids, false).await
    }

    async fn replace_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        self.write_assignments(user_id, role_ids, true).await
    }

    async fn remove_user_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> RbacResult<()> {
        sqlx::query(
            r#"
            DELETE FROM user_roles
            WHERE user_id = $1
                AND role_id = ANY($2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_uuids(role_ids))
        .execute(&self.pool)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to remove user roles: {error}")))?;

        Ok(())
    }

    async fn list_users_with_role(
        &self,
        context: TenantContext,
        role_id: RoleId,
    ) -> RbacResult<Vec<UserAccount>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT users.id, users.tenant_id, users.email, users.display_name
            FROM users
            INNER JOIN user_roles
                ON user_roles.user_id = users.id
            WHERE user_roles.role_id = $1
                AND ($2::uuid IS NULL OR users.tenant_id = $2)
            ORDER BY users.display_name, users.id
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(context_tenant(context))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            RbacError::Internal(format!("failed to list users with role: {error}"))
        })?;

        Ok(rows.into_iter().map(UserAccount::from).collect())
    }
}
