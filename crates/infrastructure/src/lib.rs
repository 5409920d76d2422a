//! Infrastructure adapters for the access-control ports.

#![forbid(unsafe_code)]

mod in_memory_rbac_store;
mod postgres_permission_registry;
mod postgres_rbac_rows;
mod postgres_role_repository;
mod postgres_user_role_repository;

pub use in_memory_rbac_store::InMemoryRbacStore;
pub use postgres_permission_registry::PostgresPermissionRegistry;
pub use postgres_role_repository::PostgresRoleRepository;
pub use postgres_user_role_repository::PostgresUserRoleRepository;
