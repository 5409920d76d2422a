use std::sync::Arc;

use scholaris_core::{RbacError, Scope, TenantContext, TenantId};
use scholaris_domain::{PermissionCode, PermissionId, RoleKind};

use crate::test_fakes::FakeRbacStore;
use crate::{CreateRoleInput, RoleListFilter, RoleService, UpdateRoleInput};

async fn service() -> (RoleService, Arc<FakeRbacStore>) {
    let store = Arc::new(FakeRbacStore::with_system_roles().await);
    (RoleService::new(store.clone(), store.clone()), store)
}

fn tenant_role(tenant_id: TenantId, name: &str) -> CreateRoleInput {
    CreateRoleInput {
        tenant_id: Some(tenant_id),
        name: name.to_owned(),
        description: format!("{name} role"),
        ..CreateRoleInput::default()
    }
}

#[tokio::test]
async fn create_role_requires_name() {
    let (service, store) = service().await;
    let tenant_id = TenantId::new();

    let result = service
        .create_role(TenantContext::Tenant(tenant_id), tenant_role(tenant_id, "  "))
        .await;

    assert_eq!(result, Err(RbacError::RoleNameRequired));
    assert_eq!(*store.writes.lock().await, 0);
}

#[tokio::test]
async fn create_role_populates_resolved_permissions() {
    let (service, store) = service().await;
    let tenant_id = TenantId::new();
    let read = store.permission_id(PermissionCode::StudentsRead).await;

    let result = service
        .create_role(
            TenantContext::Tenant(tenant_id),
            CreateRoleInput {
                permission_ids: vec![read, read],
                ..tenant_role(tenant_id, "Librarian")
            },
        )
        .await;

    assert!(result.is_ok());
    let role = result.unwrap_or_else(|_| unreachable!());
    assert_eq!(role.scope(), Scope::Tenant(tenant_id));
    assert_eq!(role.kind(), RoleKind::Custom);
    assert_eq!(role.permissions().len(), 1);
    assert!(role.grants(PermissionCode::StudentsRead));
}

#[tokio::test]
async fn create_role_rejects_unknown_permission_ids() {
    let (service, store) = service().await;
    let tenant_id = TenantId::new();
    let known = store.permission_id(PermissionCode::StudentsRead).await;
    let unknown = PermissionId::new();

    let result = service
        .create_role(
            TenantContext::Tenant(tenant_id),
            CreateRoleInput {
                permission_ids: vec![known, unknown],
                ..tenant_role(tenant_id, "Librarian")
            },
        )
        .await;

    assert_eq!(result, Err(RbacError::PermissionNotFound(unknown.to_string())));
}

#[tokio::test]
async fn create_role_rejects_name_collision_in_same_scope_only() {
    let (service, _) = service().await;
    let left = TenantId::new();
    let right = TenantId::new();

    let first = service
        .create_role(TenantContext::Tenant(left), tenant_role(left, "Librarian"))
        .await;
    assert!(first.is_ok());

    let duplicate = service
        .create_role(TenantContext::Tenant(left), tenant_role(left, "Librarian"))
        .await;
    assert_eq!(duplicate, Err(RbacError::RoleNameExists("Librarian".to_owned())));

    let other_tenant = service
        .create_role(TenantContext::Tenant(right), tenant_role(right, "Librarian"))
        .await;
    assert!(other_tenant.is_ok());
}

#[tokio::test]
async fn tenant_role_cannot_shadow_system_role_name() {
    let (service, _) = service().await;
    let tenant_id = TenantId::new();

    let result = service
        .create_role(TenantContext::Tenant(tenant_id), tenant_role(tenant_id, "Teacher"))
        .await;

    assert_eq!(result, Err(RbacError::RoleNameExists("Teacher".to_owned())));
}

#[tokio::test]
async fn tenant_context_cannot_create_roles_elsewhere() {
    let (service, _) = service().await;
    let tenant_id = TenantId::new();

    let foreign = service
        .create_role(
            TenantContext::Tenant(tenant_id),
            tenant_role(TenantId::new(), "Librarian"),
        )
        .await;
    assert!(matches!(foreign, Err(RbacError::AccessDenied(_))));

    let system = service
        .create_role(
            TenantContext::Tenant(tenant_id),
            CreateRoleInput {
                is_system: true,
                ..tenant_role(tenant_id, "Registrar")
            },
        )
        .await;
    assert!(matches!(system, Err(RbacError::AccessDenied(_))));
}

#[tokio::test]
async fn update_role_rechecks_uniqueness_excluding_itself() {
    let (service, _) = service().await;
    let tenant_id = TenantId::new();
    let context = TenantContext::Tenant(tenant_id);

    let librarian = service
        .create_role(context, tenant_role(tenant_id, "Librarian"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let counselor = service
        .create_role(context, tenant_role(tenant_id, "Counselor"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let same_name = service
        .update_role(
            context,
            librarian.id(),
            UpdateRoleInput {
                name: Some("Librarian".to_owned()),
                description: Some("Runs the library".to_owned()),
            },
        )
        .await;
    assert!(same_name.is_ok());
    assert_eq!(
        same_name.unwrap_or_else(|_| unreachable!()).description(),
        "Runs the library"
    );

    let collision = service
        .update_role(
            context,
            counselor.id(),
            UpdateRoleInput {
                name: Some("Librarian".to_owned()),
                description: None,
            },
        )
        .await;
    assert_eq!(collision, Err(RbacError::RoleNameExists("Librarian".to_owned())));
}

#[tokio::test]
async fn system_roles_reject_permission_changes_and_deletion() {
    let (service, store) = service().await;
    let teacher = store.system_role_id("Teacher").await;
    let finance = store.permission_id(PermissionCode::FinanceWrite).await;
    let context = TenantContext::Platform;

    let assign = service
        .assign_permissions(context, teacher, vec![finance])
        .await;
    assert_eq!(assign, Err(RbacError::CannotModifySystem("Teacher".to_owned())));

    let remove = service
        .remove_permissions(context, teacher, vec![finance])
        .await;
    assert_eq!(remove, Err(RbacError::CannotModifySystem("Teacher".to_owned())));

    let set = service.set_permissions(context, teacher, Vec::new()).await;
    assert_eq!(set, Err(RbacError::CannotModifySystem("Teacher".to_owned())));

    let delete = service.delete_role(context, teacher).await;
    assert_eq!(delete, Err(RbacError::CannotDeleteSystem("Teacher".to_owned())));

    assert_eq!(*store.writes.lock().await, 0);
}

#[tokio::test]
async fn permission_association_verbs_apply_set_semantics() {
    let (service, store) = service().await;
    let tenant_id = TenantId::new();
    let context = TenantContext::Tenant(tenant_id);
    let read = store.permission_id(PermissionCode::DocumentsRead).await;
    let write = store.permission_id(PermissionCode::DocumentsWrite).await;
    let reports = store.permission_id(PermissionCode::ReportsRead).await;

    let role = service
        .create_role(
            context,
            CreateRoleInput {
                permission_ids: vec![read],
                ..tenant_role(tenant_id, "Archivist")
            },
        )
        .await
        .unwrap_or_else(|_| unreachable!());

    let appended = service
        .assign_permissions(context, role.id(), vec![read, write])
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(appended.permissions().len(), 2);

    let removed = service
        .remove_permissions(context, role.id(), vec![write, PermissionId::new()])
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(removed.permissions().len(), 1);
    assert!(removed.grants(PermissionCode::DocumentsRead));

    let replaced = service
        .set_permissions(context, role.id(), vec![reports])
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(replaced.permissions().len(), 1);
    assert!(replaced.grants(PermissionCode::ReportsRead));

    let rejected = service
        .set_permissions(context, role.id(), vec![PermissionId::new()])
        .await;
    assert!(matches!(rejected, Err(RbacError::PermissionNotFound(_))));
}

#[tokio::test]
async fn delete_role_rejects_assigned_roles() {
    let (service, store) = service().await;
    let tenant_id = TenantId::new();
    let context = TenantContext::Tenant(tenant_id);
    let role = service
        .create_role(context, tenant_role(tenant_id, "Coach"))
        .await
        .unwrap_or_else(|_| unreachable!());

    store
        .grant_role(scholaris_domain::UserId::new(), role.id())
        .await;

    let result = service.delete_role(context, role.id()).await;
    assert_eq!(result, Err(RbacError::RoleInUse("Coach".to_owned())));
}

#[tokio::test]
async fn list_roles_orders_system_first_and_searches() {
    let (service, _) = service().await;
    let tenant_id = TenantId::new();
    let context = TenantContext::Tenant(tenant_id);
    for name in ["Zookeeper", "Archivist"] {
        let created = service
            .create_role(context, tenant_role(tenant_id, name))
            .await;
        assert!(created.is_ok());
    }

    let all = service
        .list_roles(
            context,
            RoleListFilter {
                tenant_id: Some(tenant_id),
                include_system: true,
                search: None,
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(all.len(), 9);
    assert!(all[..7].iter().all(|role| role.is_system()));
    assert_eq!(all[7].name().as_str(), "Archivist");
    assert_eq!(all[8].name().as_str(), "Zookeeper");

    let searched = service
        .list_roles(
            context,
            RoleListFilter {
                tenant_id: Some(tenant_id),
                include_system: false,
                search: Some("ZOO".to_owned()),
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(searched.len(), 1);
}

#[tokio::test]
async fn seed_system_roles_is_idempotent() {
    let (service, store) = service().await;

    let report = service.seed_system_roles().await;
    assert!(report.is_ok());
    let report = report.unwrap_or_default();
    assert!(report.created.is_empty());
    assert_eq!(report.existing.len(), 7);
    assert_eq!(store.role_count().await, 7);
}

#[tokio::test]
async fn seed_system_roles_creates_missing_roles() {
    let store = Arc::new(FakeRbacStore::default());
    let service = RoleService::new(store.clone(), store.clone());

    let first = service.seed_system_roles().await.unwrap_or_default();
    assert_eq!(first.created.len(), 7);

    let teacher = service
        .get_role_by_name(TenantContext::Tenant(TenantId::new()), "Teacher", None)
        .await;
    assert!(teacher.is_ok());
    let teacher = teacher.unwrap_or_else(|_| unreachable!());
    assert!(teacher.is_system());
    assert_eq!(teacher.kind(), RoleKind::Teacher);
    assert!(teacher.grants(PermissionCode::AcademicsWrite));

    let second = service.seed_system_roles().await.unwrap_or_default();
    assert!(second.created.is_empty());
    assert_eq!(store.role_count().await, 7);
}

#[tokio::test]
async fn seeding_reports_system_names_held_by_a_tenant_role() {
    let store = Arc::new(FakeRbacStore::default());
    let service = RoleService::new(store.clone(), store.clone());
    let tenant_id = TenantId::new();
    let context = TenantContext::Tenant(tenant_id);

    let custom = service
        .create_role(context, tenant_role(tenant_id, "Teacher"))
        .await;
    assert!(custom.is_ok());

    let report = service.seed_system_roles().await;
    assert!(report.is_ok());
    let report = report.unwrap_or_default();
    assert_eq!(report.conflicts, vec!["Teacher".to_owned()]);
    assert_eq!(report.created.len(), 6);
    assert!(!report.created.contains(&"Teacher".to_owned()));

    let platform = service
        .get_role_by_name(TenantContext::Platform, "Teacher", None)
        .await;
    assert_eq!(platform, Err(RbacError::RoleNotFound("Teacher".to_owned())));

    let global = service
        .create_role(
            TenantContext::Platform,
            CreateRoleInput {
                tenant_id: None,
                ..tenant_role(tenant_id, "Teacher")
            },
        )
        .await;
    assert_eq!(global, Err(RbacError::RoleNameExists("Teacher".to_owned())));
}
