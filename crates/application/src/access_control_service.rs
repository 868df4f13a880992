use std::collections::BTreeMap;
use std::sync::Arc;

use gymgate_core::{AppError, AppResult, CallerIdentity, NonEmptyString, UserId};
use gymgate_domain::{Permission, PermissionId, Role, RoleId, permission_names};
use tracing::info;

use crate::access_control_ports::{
    AccessControlRepository, NewRole, PermissionSync, RoleDelta, RoleUpdate,
};
use crate::authorization_service::AuthorizationService;

mod matrix;
mod roles;
mod user_roles;

pub use matrix::{PermissionMatrix, PermissionMatrixEntry};

/// Administration service for the permission catalog, roles, and bindings.
///
/// Every operation is gated by the `roles.manage` permission resolved through
/// [`AuthorizationService`], except the derived primary-role projection which
/// is a plain read used by profile rendering.
#[derive(Clone)]
pub struct AccessControlService {
    authorization: AuthorizationService,
    repository: Arc<dyn AccessControlRepository>,
}

impl AccessControlService {
    /// Creates an access-control service from a repository implementation.
    #[must_use]
    pub fn new(
        authorization: AuthorizationService,
        repository: Arc<dyn AccessControlRepository>,
    ) -> Self {
        Self {
            authorization,
            repository,
        }
    }

    async fn require_manage(&self, caller: &CallerIdentity) -> AppResult<()> {
        self.authorization
            .require_permission(caller, permission_names::ROLES_MANAGE)
            .await
    }
}

#[cfg(test)]
mod tests;
