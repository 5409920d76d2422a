use scholaris_core::Scope;
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Hierarchy rank shared by every tenant-defined role.
pub const CUSTOM_ROLE_LEVEL: u8 = 100;

/// Closed set of role identities ranked by privilege.
///
/// Lower levels are more privileged. Every role that is not one of the seven
/// seeded system roles is `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Platform-wide administrator.
    SuperAdmin,
    /// Administrator of one school.
    TenantAdmin,
    /// School principal.
    Principal,
    /// Teaching staff.
    Teacher,
    /// Non-teaching staff.
    Staff,
    /// Parent or guardian.
    Parent,
    /// Enrolled student.
    Student,
    /// Tenant-defined role.
    Custom,
}

impl RoleKind {
    /// Returns the hierarchy level of this kind.
    #[must_use]
    pub fn level(&self) -> u8 {
        match self {
            Self::SuperAdmin => 0,
            Self::TenantAdmin => 1,
            Self::Principal => 2,
            Self::Teacher => 3,
            Self::Staff => 4,
            Self::Parent => 5,
            Self::Student => 6,
            Self::Custom => CUSTOM_ROLE_LEVEL,
        }
    }

    /// Returns the canonical role name for system kinds.
    #[must_use]
    pub fn system_name(&self) -> Option<&'static str> {
        match self {
            Self::SuperAdmin => Some("SuperAdmin"),
            Self::TenantAdmin => Some("TenantAdmin"),
            Self::Principal => Some("Principal"),
            Self::Teacher => Some("Teacher"),
            Self::Staff => Some("Staff"),
            Self::Parent => Some("Parent"),
            Self::Student => Some("Student"),
            Self::Custom => None,
        }
    }

    /// Returns the seven system kinds from most to least privileged.
    #[must_use]
    pub fn system_kinds() -> &'static [Self] {
        const SYSTEM: &[RoleKind] = &[
            RoleKind::SuperAdmin,
            RoleKind::TenantAdmin,
            RoleKind::Principal,
            RoleKind::Teacher,
            RoleKind::Staff,
            RoleKind::Parent,
            RoleKind::Student,
        ];

        SYSTEM
    }

    /// Looks up a system kind by canonical name.
    #[must_use]
    pub fn from_system_name(name: &str) -> Option<Self> {
        Self::system_kinds()
            .iter()
            .copied()
            .find(|kind| kind.system_name() == Some(name))
    }

    /// Derives the kind of a stored role.
    ///
    /// Only global system roles carry a canonical kind; a tenant role reusing
    /// a canonical name ranks as `Custom`.
    #[must_use]
    pub fn classify(name: &str, scope: Scope, is_system: bool) -> Self {
        if !is_system || !scope.is_global() {
            return Self::Custom;
        }

        Self::from_system_name(name).unwrap_or(Self::Custom)
    }

    /// Returns whether a holder of this kind may grant `target`.
    #[must_use]
    pub fn can_assign(&self, target: RoleKind) -> bool {
        self.level() <= target.level()
    }
}

/// Privilege ordering used to bound delegation.
pub struct RoleHierarchy;

impl RoleHierarchy {
    /// Returns the level of a role, lower is more privileged.
    #[must_use]
    pub fn level_of(role: &Role) -> u8 {
        role.kind().level()
    }

    /// Returns whether `source` may assign `target` to someone.
    #[must_use]
    pub fn can_assign(source: &Role, target: &Role) -> bool {
        Self::level_of(source) <= Self::level_of(target)
    }
}
