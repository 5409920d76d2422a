use async_trait::async_trait;

use scholaris_core::RbacResult;
use scholaris_domain::{Permission, PermissionCode, PermissionId};

/// Filter for catalog listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionFilter {
    /// Restricts results to these codes.
    pub codes: Option<Vec<PermissionCode>>,
    /// Case-insensitive substring match on the code.
    pub search: Option<String>,
}

impl PermissionFilter {
    /// Returns whether a permission passes the filter.
    #[must_use]
    pub fn matches(&self, permission: &Permission) -> bool {
        let code_matches = self
            .codes
            .as_ref()
            .is_none_or(|codes| codes.contains(&permission.code()));
        let search_matches = self.search.as_deref().is_none_or(|search| {
            permission
                .code()
                .as_str()
                .contains(search.trim().to_lowercase().as_str())
        });

        code_matches && search_matches
    }
}

/// Repository port for the permission catalog.
#[async_trait]
pub trait PermissionRegistry: Send + Sync {
    /// Returns the permissions found among `ids`.
    ///
    /// Never fails on a partial match; callers compare cardinality.
    async fn resolve(&self, ids: &[PermissionId]) -> RbacResult<Vec<Permission>>;

    /// Lists catalog entries ordered by code.
    async fn list_all(&self, filter: PermissionFilter) -> RbacResult<Vec<Permission>>;

    /// Inserts any missing codes and returns the records for `codes`.
    async fn ensure_catalog(&self, codes: &[PermissionCode]) -> RbacResult<Vec<Permission>>;
}
