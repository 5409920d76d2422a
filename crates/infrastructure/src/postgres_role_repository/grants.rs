use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum GrantWrite {
    Append,
    Replace,
    Remove,
}

impl PostgresRoleRepository {
    /// Applies one association verb to a role's grants in a single transaction.
    pub(super) async fn write_grants(
        &self,
        role_id: RoleId,
        write: GrantWrite,
        permission_ids: &[PermissionId],
    ) -> RbacResult<()> {
        let mut transaction = self.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM roles
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| RbacError::Internal(format!("failed to lock role: {error}")))?;

        if locked.is_none() {
            return Err(RbacError::RoleNotFound(role_id.to_string()));
        }

        match write {
            GrantWrite::Append => {
                insert_grants(&mut transaction, role_id.as_uuid(), permission_ids).await?;
            }
            GrantWrite::Replace => {
                sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                    .bind(role_id.as_uuid())
                    .execute(&mut *transaction)
                    .await
                    .map_err(|error| {
                        RbacError::Internal(format!("failed to clear role grants: {error}"))
                    })?;
                insert_grants(&mut transaction, role_id.as_uuid(), permission_ids).await?;
            }
            GrantWrite::Remove => {
                sqlx::query(
                    r#"
                    DELETE FROM role_permissions
                    WHERE role_id = $1
                        AND permission_id = ANY($2)
                    "#,
                )
                .bind(role_id.as_uuid())
                .bind(permission_uuids(permission_ids))
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    RbacError::Internal(format!("failed to remove role grants: {error}"))
                })?;
            }
        }

        sqlx::query("UPDATE roles SET updated_at = now() WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| RbacError::Internal(format!("failed to touch role: {error}")))?;

        commit(transaction).await
    }
}
