mod permissions;
mod roles;
mod user_roles;

pub use permissions::{PermissionFilter, PermissionRegistry};
pub use roles::{
    CreateRoleInput, NewRole, RoleDetailsUpdate, RoleListFilter, RoleRepository, UpdateRoleInput,
};
pub use user_roles::UserRoleRepository;
