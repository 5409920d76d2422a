//! Application services and ports for school access control.

#![forbid(unsafe_code)]

mod authorization_service;
mod deadline;
mod rbac_ports;
mod role_service;
mod user_role_service;

#[cfg(test)]
mod test_fakes;

pub use authorization_service::AuthorizationService;
pub use deadline::with_deadline;
pub use rbac_ports::{
    CreateRoleInput, NewRole, PermissionFilter, PermissionRegistry, RoleDetailsUpdate,
    RoleListFilter, RoleRepository, UpdateRoleInput, UserRoleRepository,
};
pub use role_service::{RoleService, SeedReport};
pub use user_role_service::UserRoleService;
