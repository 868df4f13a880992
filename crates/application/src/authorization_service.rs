use std::collections::HashSet;
use std::sync::Arc;

use gymgate_core::{AppError, AppResult, CallerIdentity, UserId};
use gymgate_domain::{Permission, PermissionId};
use tracing::warn;

use crate::access_control_ports::AccessControlRepository;

/// Computes effective permission sets and gates privileged operations.
///
/// This is the single source of truth consulted before any privileged
/// mutation: role administration, subscription review, and manual
/// subscription creation all go through [`AuthorizationService`].
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AccessControlRepository>,
}

impl AuthorizationService {
    /// Creates an authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessControlRepository>) -> Self {
        Self { repository }
    }

    /// Returns the de-duplicated union of permissions reachable through any
    /// role currently bound to the user.
    ///
    /// A user with zero roles yields an empty set, not an error. A permission
    /// reachable through several roles is counted once. Bindings to inactive
    /// roles still contribute until explicitly revoked.
    pub async fn effective_permissions(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        let permissions = self.repository.list_permissions_for_user(user_id).await?;

        let mut seen: HashSet<PermissionId> = HashSet::new();
        let mut unique = Vec::with_capacity(permissions.len());
        for permission in permissions {
            if seen.insert(permission.id) {
                unique.push(permission);
            }
        }

        Ok(unique)
    }

    /// Returns whether the user currently holds the named permission.
    pub async fn has_permission(&self, user_id: UserId, permission_name: &str) -> AppResult<bool> {
        let permissions = self.effective_permissions(user_id).await?;
        Ok(permissions
            .iter()
            .any(|permission| permission.name == permission_name))
    }

    /// Ensures the caller holds the named permission.
    pub async fn require_permission(
        &self,
        caller: &CallerIdentity,
        permission_name: &str,
    ) -> AppResult<()> {
        if self.has_permission(caller.user_id(), permission_name).await? {
            return Ok(());
        }

        warn!(
            caller = %caller.user_id(),
            permission = permission_name,
            "privileged call denied"
        );

        Err(AppError::Forbidden(format!(
            "caller '{}' is missing permission '{permission_name}'",
            caller.user_id()
        )))
    }
}
