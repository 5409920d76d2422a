use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::warn;
use uuid::Uuid;

use scholaris_core::{RbacError, RbacResult, Scope, TenantContext, TenantId};
use scholaris_domain::{
    Permission, PermissionId, Role, RoleId, RoleName, UserAccount, UserId,
    decode_stored_permission_code,
};

/// Role columns joined with their grants, one row per granted permission.
pub(crate) const ROLE_SELECT: &str = r#"
    SELECT
        roles.id AS role_id,
        roles.tenant_id,
        roles.name,
        roles.description,
        roles.is_system,
        roles.created_at,
        roles.updated_at,
        permissions.id AS permission_id,
        permissions.code AS permission_code
    FROM roles
    LEFT JOIN role_permissions AS grants
        ON grants.role_id = roles.id
    LEFT JOIN permissions
        ON permissions.id = grants.permission_id
"#;

/// Rows the caller's context may read: every row for platform operators,
/// otherwise global rows plus the tenant's own. Binds the tenant as `$1`.
pub(crate) const ROLE_VISIBILITY: &str =
    "($1::uuid IS NULL OR roles.tenant_id IS NULL OR roles.tenant_id = $1)";

#[derive(Debug, FromRow)]
pub(crate) struct RoleRow {
    role_id: Uuid,
    tenant_id: Option<Uuid>,
    name: String,
    description: String,
    is_system: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    permission_id: Option<Uuid>,
    permission_code: Option<String>,
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    tenant_id: Option<Uuid>,
    email: Option<String>,
    display_name: String,
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        UserAccount::new(
            UserId::from_uuid(row.id),
            Scope::from_tenant_id(row.tenant_id.map(TenantId::from_uuid)),
            row.email,
            row.display_name,
        )
    }
}

/// Returns the tenant bound by visibility predicates, `None` for platform operators.
pub(crate) fn context_tenant(context: TenantContext) -> Option<Uuid> {
    context.tenant_filter().map(|tenant_id| tenant_id.as_uuid())
}

pub(crate) fn role_uuids(role_ids: &[RoleId]) -> Vec<Uuid> {
    let unique: BTreeSet<RoleId> = role_ids.iter().copied().collect();
    unique.into_iter().map(|role_id| role_id.as_uuid()).collect()
}

pub(crate) fn permission_uuids(permission_ids: &[PermissionId]) -> Vec<Uuid> {
    let unique: BTreeSet<PermissionId> = permission_ids.iter().copied().collect();
    unique
        .into_iter()
        .map(|permission_id| permission_id.as_uuid())
        .collect()
}

/// Decodes a stored permission, skipping codes this build does not know.
pub(crate) fn decode_permission(permission_id: Uuid, code: &str) -> Option<Permission> {
    match decode_stored_permission_code(code) {
        Ok(code) => Some(Permission::new(PermissionId::from_uuid(permission_id), code)),
        Err(error) => {
            warn!(%permission_id, code, %error, "skipping unknown stored permission code");
            None
        }
    }
}

/// Folds joined role rows into roles, keeping the order in which roles first appear.
pub(crate) fn aggregate_roles(rows: Vec<RoleRow>) -> RbacResult<Vec<Role>> {
    struct Pending {
        row: RoleRow,
        permissions: Vec<Permission>,
    }

    let mut order: Vec<Uuid> = Vec::new();
    let mut by_id: HashMap<Uuid, Pending> = HashMap::new();

    for row in rows {
        let grant = match (row.permission_id, row.permission_code.as_deref()) {
            (Some(permission_id), Some(code)) => decode_permission(permission_id, code),
            _ => None,
        };

        let pending = match by_id.entry(row.role_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                order.push(row.role_id);
                entry.insert(Pending {
                    row,
                    permissions: Vec::new(),
                })
            }
        };

        if let Some(permission) = grant {
            pending.permissions.push(permission);
        }
    }

    order
        .into_iter()
        .filter_map(|role_id| by_id.remove(&role_id))
        .map(|pending| {
            let row = pending.row;
            let name = RoleName::new(row.name).map_err(|error| {
                RbacError::Internal(format!(
                    "invalid stored name for role '{}': {error}",
                    row.role_id
                ))
            })?;

            Ok(Role::new(
                RoleId::from_uuid(row.role_id),
                Scope::from_tenant_id(row.tenant_id.map(TenantId::from_uuid)),
                name,
                row.description,
                row.is_system,
                pending.permissions,
            )
            .with_timestamps(row.created_at, row.updated_at))
        })
        .collect()
}

/// Maps a database error to the given business error when its SQLSTATE matches.
pub(crate) fn map_database_error(
    error: sqlx::Error,
    code: &str,
    business_error: RbacError,
    action: &str,
) -> RbacError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some(code)
    {
        return business_error;
    }

    RbacError::Internal(format!("failed to {action}: {error}"))
}

pub(crate) const UNIQUE_VIOLATION: &str = "23505";
pub(crate) const FOREIGN_KEY_VIOLATION: &str = "23503";
