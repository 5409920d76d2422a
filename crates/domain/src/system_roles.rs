//! Fixed permission sets applied by the one-time system role bootstrap.

use crate::hierarchy::RoleKind;
use crate::permission::PermissionCode;

/// Version of the seeded permission sets. Bump when a set changes.
pub const SYSTEM_ROLE_SEED_VERSION: u32 = 1;

/// Seed definition for one system role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemRoleSeed {
    /// Canonical role kind.
    pub kind: RoleKind,
    /// Stored description.
    pub description: &'static str,
    /// Granted permission codes.
    pub permissions: &'static [PermissionCode],
}

impl SystemRoleSeed {
    /// Returns the canonical role name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.system_name().unwrap_or("Custom")
    }
}

const TENANT_ADMIN_PERMISSIONS: &[PermissionCode] = &[
    PermissionCode::UsersRead,
    PermissionCode::UsersWrite,
    PermissionCode::TenantsRead,
    PermissionCode::BranchesRead,
    PermissionCode::BranchesWrite,
    PermissionCode::AcademicsRead,
    PermissionCode::AcademicsWrite,
    PermissionCode::StudentsRead,
    PermissionCode::StudentsWrite,
    PermissionCode::AttendanceRead,
    PermissionCode::AttendanceWrite,
    PermissionCode::FinanceRead,
    PermissionCode::FinanceWrite,
    PermissionCode::DocumentsRead,
    PermissionCode::DocumentsWrite,
    PermissionCode::RolesRead,
    PermissionCode::RolesWrite,
    PermissionCode::RolesAssign,
    PermissionCode::ReportsRead,
    PermissionCode::SettingsRead,
    PermissionCode::SettingsWrite,
    PermissionCode::NotificationsSend,
];

const PRINCIPAL_PERMISSIONS: &[PermissionCode] = &[
    PermissionCode::UsersRead,
    PermissionCode::BranchesRead,
    PermissionCode::AcademicsRead,
    PermissionCode::AcademicsWrite,
    PermissionCode::StudentsRead,
    PermissionCode::StudentsWrite,
    PermissionCode::AttendanceRead,
    PermissionCode::AttendanceWrite,
    PermissionCode::FinanceRead,
    PermissionCode::DocumentsRead,
    PermissionCode::DocumentsWrite,
    PermissionCode::RolesRead,
    PermissionCode::RolesAssign,
    PermissionCode::ReportsRead,
    PermissionCode::SettingsRead,
    PermissionCode::NotificationsSend,
];

const TEACHER_PERMISSIONS: &[PermissionCode] = &[
    PermissionCode::AcademicsRead,
    PermissionCode::AcademicsWrite,
    PermissionCode::StudentsRead,
    PermissionCode::AttendanceRead,
    PermissionCode::AttendanceWrite,
    PermissionCode::DocumentsRead,
    PermissionCode::ReportsRead,
];

const STAFF_PERMISSIONS: &[PermissionCode] = &[
    PermissionCode::BranchesRead,
    PermissionCode::StudentsRead,
    PermissionCode::AttendanceRead,
    PermissionCode::FinanceRead,
    PermissionCode::FinanceWrite,
    PermissionCode::DocumentsRead,
    PermissionCode::DocumentsWrite,
];

const PARENT_PERMISSIONS: &[PermissionCode] = &[
    PermissionCode::AcademicsRead,
    PermissionCode::StudentsRead,
    PermissionCode::AttendanceRead,
    PermissionCode::DocumentsRead,
];

const STUDENT_PERMISSIONS: &[PermissionCode] = &[
    PermissionCode::AcademicsRead,
    PermissionCode::AttendanceRead,
];

/// Returns the seed definitions from most to least privileged.
#[must_use]
pub fn system_role_seeds() -> [SystemRoleSeed; 7] {
    [
        SystemRoleSeed {
            kind: RoleKind::SuperAdmin,
            description: "Platform administrator with every permission",
            permissions: PermissionCode::all(),
        },
        SystemRoleSeed {
            kind: RoleKind::TenantAdmin,
            description: "School administrator managing one tenant",
            permissions: TENANT_ADMIN_PERMISSIONS,
        },
        SystemRoleSeed {
            kind: RoleKind::Principal,
            description: "School principal overseeing academics and staff",
            permissions: PRINCIPAL_PERMISSIONS,
        },
        SystemRoleSeed {
            kind: RoleKind::Teacher,
            description: "Teacher managing classes, grades and attendance",
            permissions: TEACHER_PERMISSIONS,
        },
        SystemRoleSeed {
            kind: RoleKind::Staff,
            description: "Administrative staff handling fees and documents",
            permissions: STAFF_PERMISSIONS,
        },
        SystemRoleSeed {
            kind: RoleKind::Parent,
            description: "Parent or guardian following a student",
            permissions: PARENT_PERMISSIONS,
        },
        SystemRoleSeed {
            kind: RoleKind::Student,
            description: "Enrolled student",
            permissions: STUDENT_PERMISSIONS,
        },
    ]
}
