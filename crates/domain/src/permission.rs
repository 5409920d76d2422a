use std::fmt::{Display, Formatter};
use std::str::FromStr;

use scholaris_core::{RbacError, RbacResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a permission record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Canonical catalog of grantable capabilities, stored as `resource:action` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PermissionCode {
    /// Read user accounts.
    UsersRead,
    /// Create, update and deactivate user accounts.
    UsersWrite,
    /// Read tenant (school) profiles.
    TenantsRead,
    /// Provision and update tenants.
    TenantsWrite,
    /// Read branches and campuses.
    BranchesRead,
    /// Manage branches and campuses.
    BranchesWrite,
    /// Read classes, subjects, terms and grades.
    AcademicsRead,
    /// Manage classes, subjects, terms and grades.
    AcademicsWrite,
    /// Read student records.
    StudentsRead,
    /// Enrol and update student records.
    StudentsWrite,
    /// Read attendance.
    AttendanceRead,
    /// Mark attendance.
    AttendanceWrite,
    /// Read fees, invoices and payments.
    FinanceRead,
    /// Record fees, invoices and payments.
    FinanceWrite,
    /// Read uploaded documents.
    DocumentsRead,
    /// Upload and remove documents.
    DocumentsWrite,
    /// Read role definitions.
    RolesRead,
    /// Create, update and delete roles.
    RolesWrite,
    /// Grant roles to users.
    RolesAssign,
    /// Read reports.
    ReportsRead,
    /// Read tenant settings.
    SettingsRead,
    /// Update tenant settings.
    SettingsWrite,
    /// Send SMS and email notifications.
    NotificationsSend,
}

impl PermissionCode {
    /// Returns a stable storage value for this permission code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsersRead => "users:read",
            Self::UsersWrite => "users:write",
            Self::TenantsRead => "tenants:read",
            Self::TenantsWrite => "tenants:write",
            Self::BranchesRead => "branches:read",
            Self::BranchesWrite => "branches:write",
            Self::AcademicsRead => "academics:read",
            Self::AcademicsWrite => "academics:write",
            Self::StudentsRead => "students:read",
            Self::StudentsWrite => "students:write",
            Self::AttendanceRead => "attendance:read",
            Self::AttendanceWrite => "attendance:write",
            Self::FinanceRead => "finance:read",
            Self::FinanceWrite => "finance:write",
            Self::DocumentsRead => "documents:read",
            Self::DocumentsWrite => "documents:write",
            Self::RolesRead => "roles:read",
            Self::RolesWrite => "roles:write",
            Self::RolesAssign => "roles:assign",
            Self::ReportsRead => "reports:read",
            Self::SettingsRead => "settings:read",
            Self::SettingsWrite => "settings:write",
            Self::NotificationsSend => "notifications:send",
        }
    }

    /// Returns every code in the catalog.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionCode] = &[
            PermissionCode::UsersRead,
            PermissionCode::UsersWrite,
            PermissionCode::TenantsRead,
            PermissionCode::TenantsWrite,
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

        ALL
    }
}

impl FromStr for PermissionCode {
    type Err = RbacError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|code| code.as_str() == value)
            .ok_or_else(|| RbacError::PermissionNotFound(format!("unknown permission code '{value}'")))
    }
}

impl TryFrom<String> for PermissionCode {
    type Error = RbacError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.as_str())
    }
}

impl From<PermissionCode> for String {
    fn from(value: PermissionCode) -> Self {
        value.as_str().to_owned()
    }
}

impl Display for PermissionCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Persisted permission record. The code never changes once stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    code: PermissionCode,
}

impl Permission {
    /// Creates a permission record.
    #[must_use]
    pub fn new(id: PermissionId, code: PermissionCode) -> Self {
        Self { id, code }
    }

    /// Returns the permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the permission code.
    #[must_use]
    pub fn code(&self) -> PermissionCode {
        self.code
    }
}

/// Parses a stored code, treating unknown values as corrupt storage.
pub fn decode_stored_permission_code(value: &str) -> RbacResult<PermissionCode> {
    PermissionCode::from_str(value).map_err(|error| {
        RbacError::Internal(format!("invalid stored permission code '{value}': {error}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;

    use super::PermissionCode;

    #[test]
    fn permission_code_roundtrip_storage_value() {
        let code = PermissionCode::AcademicsWrite;
        let restored = PermissionCode::from_str(code.as_str());
        assert!(restored.is_ok());
        assert_eq!(restored.unwrap_or(PermissionCode::UsersRead), code);
    }

    #[test]
    fn unknown_permission_code_is_rejected() {
        assert!(PermissionCode::from_str("students:teleport").is_err());
    }

    #[test]
    fn catalog_codes_are_unique_and_resource_scoped() {
        let codes: HashSet<&str> = PermissionCode::all().iter().map(|code| code.as_str()).collect();
        assert_eq!(codes.len(), PermissionCode::all().len());
        assert!(codes.iter().all(|code| code.split_once(':').is_some()));
    }
}
