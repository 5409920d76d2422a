use thiserror::Error;

use crate::AppError;

/// Result type returned by every RBAC operation.
pub type RbacResult<T> = Result<T, RbacError>;

/// Business-rule violations detected by the RBAC core.
///
/// Named kinds are returned verbatim to callers; `Internal` wraps unexpected
/// storage failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    /// No visible role matches the requested id or name.
    #[error("role not found: {0}")]
    RoleNotFound(String),

    /// Role name is empty or whitespace.
    #[error("role name is required")]
    RoleNameRequired,

    /// Another role in the same scope already uses the name.
    #[error("role '{0}' already exists")]
    RoleNameExists(String),

    /// One or more permission ids did not resolve.
    #[error("permission not found: {0}")]
    PermissionNotFound(String),

    /// System roles are never deleted.
    #[error("system role '{0}' cannot be deleted")]
    CannotDeleteSystem(String),

    /// System role permissions are immutable.
    #[error("system role '{0}' cannot be modified")]
    CannotModifySystem(String),

    /// Role is still referenced by user assignments.
    #[error("role '{0}' is assigned to one or more users")]
    RoleInUse(String),

    /// No visible user matches the requested id.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Tenant-owned role offered to a user of another tenant.
    #[error("role '{role}' cannot be assigned to user '{user}' outside its tenant")]
    TenantMismatch {
        /// Offending role name.
        role: String,
        /// Target user id.
        user: String,
    },

    /// Caller context is not allowed to perform the operation.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Caller-supplied deadline elapsed before the store answered.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Unexpected storage failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RbacError> for AppError {
    fn from(value: RbacError) -> Self {
        let message = value.to_string();
        match value {
            RbacError::RoleNameRequired | RbacError::PermissionNotFound(_) => {
                AppError::Validation(message)
            }
            RbacError::RoleNotFound(_) | RbacError::UserNotFound(_) => AppError::NotFound(message),
            RbacError::RoleNameExists(_) | RbacError::RoleInUse(_) => AppError::Conflict(message),
            RbacError::CannotDeleteSystem(_)
            | RbacError::CannotModifySystem(_)
            | RbacError::TenantMismatch { .. }
            | RbacError::AccessDenied(_) => AppError::Forbidden(message),
            RbacError::DeadlineExceeded(_) | RbacError::Internal(_) => AppError::Internal(message),
        }
    }
}
