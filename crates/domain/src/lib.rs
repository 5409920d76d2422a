//! Domain entities and invariants for school access control.

#![forbid(unsafe_code)]

mod hierarchy;
mod permission;
mod role;
mod system_roles;
mod user;

pub use hierarchy::{CUSTOM_ROLE_LEVEL, RoleHierarchy, RoleKind};
pub use permission::{Permission, PermissionCode, PermissionId, decode_stored_permission_code};
pub use role::{Role, RoleId, RoleName};
pub use system_roles::{SYSTEM_ROLE_SEED_VERSION, SystemRoleSeed, system_role_seeds};
pub use user::{UserAccount, UserId};
