use std::collections::HashMap;

use scholaris_domain::{PermissionCode, SYSTEM_ROLE_SEED_VERSION, system_role_seeds};
use tracing::warn;

use super::*;

/// Outcome of a system role bootstrap run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Seed set version applied.
    pub version: u32,
    /// Roles created by this run.
    pub created: Vec<String>,
    /// Roles that already existed and were left untouched.
    pub existing: Vec<String>,
    /// System roles not created because a tenant role already holds the name.
    pub conflicts: Vec<String>,
}

impl RoleService {
    /// Creates any missing system role with its fixed permission set.
    ///
    /// Existing roles are never edited, so running this twice is a no-op. A
    /// tenant role that already uses a system name blocks that seed and is
    /// listed in [`SeedReport::conflicts`].
    pub async fn seed_system_roles(&self) -> RbacResult<SeedReport> {
        let catalog: HashMap<PermissionCode, PermissionId> = self
            .permission_registry
            .ensure_catalog(PermissionCode::all())
            .await?
            .into_iter()
            .map(|permission| (permission.code(), permission.id()))
            .collect();

        let mut report = SeedReport {
            version: SYSTEM_ROLE_SEED_VERSION,
            ..SeedReport::default()
        };

        for seed in system_role_seeds() {
            let existing = self
                .repository
                .find_role_by_name(TenantContext::Platform, Scope::Global, seed.name())
                .await?;

            if let Some(role) = existing {
                if !role.is_system() {
                    warn!(role_name = seed.name(), "global role with system name is not marked system");
                }
                report.existing.push(seed.name().to_owned());
                continue;
            }

            let permission_ids = seed
                .permissions
                .iter()
                .map(|code| {
                    catalog.get(code).copied().ok_or_else(|| {
                        RbacError::Internal(format!("permission '{code}' missing from catalog"))
                    })
                })
                .collect::<RbacResult<Vec<_>>>()?;

            let inserted = self
                .repository
                .insert_role(NewRole {
                    scope: Scope::Global,
                    name: RoleName::new(seed.name())?,
                    description: seed.description.to_owned(),
                    is_system: true,
                    permission_ids,
                })
                .await;

            match inserted {
                Ok(role_id) => {
                    info!(%role_id, role_name = seed.name(), "system role seeded");
                    report.created.push(seed.name().to_owned());
                }
                Err(RbacError::RoleNameExists(_)) => {
                    let raced = self
                        .repository
                        .find_role_by_name(TenantContext::Platform, Scope::Global, seed.name())
                        .await?;

                    if raced.is_some() {
                        report.existing.push(seed.name().to_owned());
                    } else {
                        warn!(role_name = seed.name(), "tenant role holds a system role name");
                        report.conflicts.push(seed.name().to_owned());
                    }
                }
                Err(error) => return Err(error),
            }
        }

        info!(
            version = report.version,
            created = report.created.len(),
            existing = report.existing.len(),
            conflicts = report.conflicts.len(),
            "system role seed completed"
        );

        Ok(report)
    }
}
