use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use scholaris_application::{PermissionFilter, PermissionRegistry};
use scholaris_core::{RbacError, RbacResult};
use scholaris_domain::{Permission, PermissionCode, PermissionId};

use crate::postgres_rbac_rows::{decode_permission, permission_uuids};

/// PostgreSQL-backed permission catalog.
#[derive(Clone)]
pub struct PostgresPermissionRegistry {
    pool: PgPool,
}

impl PostgresPermissionRegistry {
    /// Creates a registry with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    code: String,
}

impl PermissionRow {
    fn decode(self) -> Option<Permission> {
        decode_permission(self.id, self.code.as_str())
    }
}

#[async_trait]
impl PermissionRegistry for PostgresPermissionRegistry {
    async fn resolve(&self, ids: &[PermissionId]) -> RbacResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, code
            FROM permissions
            WHERE id = ANY($1)
            ORDER BY code
            "#,
        )
        .bind(permission_uuids(ids))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to resolve permissions: {error}")))?;

        Ok(rows.into_iter().filter_map(PermissionRow::decode).collect())
    }

    async fn list_all(&self, filter: PermissionFilter) -> RbacResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, code
            FROM permissions
            ORDER BY code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to list permissions: {error}")))?;

        Ok(rows
            .into_iter()
            .filter_map(PermissionRow::decode)
            .filter(|permission| filter.matches(permission))
            .collect())
    }

    async fn ensure_catalog(&self, codes: &[PermissionCode]) -> RbacResult<Vec<Permission>> {
        let codes: Vec<String> = codes.iter().map(|code| code.as_str().to_owned()).collect();

        let mut transaction =
            self.pool.begin().await.map_err(|error| {
                RbacError::Internal(format!("failed to begin transaction: {error}"))
            })?;

        sqlx::query(
            r#"
            INSERT INTO permissions (code)
            SELECT UNNEST($1::text[])
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(&codes)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            RbacError::Internal(format!("failed to register permission codes: {error}"))
        })?;

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, code
            FROM permissions
            WHERE code = ANY($1)
            ORDER BY code
            "#,
        )
        .bind(&codes)
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to load permissions: {error}")))?;

        transaction.commit().await.map_err(|error| {
            RbacError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(rows.into_iter().filter_map(PermissionRow::decode).collect())
    }
}
