use super::*;

use std::collections::HashSet;

use gymgate_core::AppError;
use gymgate_domain::SYSTEM_ROLE_TRAINER;

/// One row of the permission matrix: a catalog entry and its granted flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrixEntry {
    /// Catalog permission.
    pub permission: Permission,
    /// Whether the role currently holds the permission.
    pub granted: bool,
}

/// Boolean grid of the full permission catalog against one role, driving the
/// bulk on/off editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionMatrix {
    /// The role being edited.
    pub role: Role,
    /// One entry per catalog permission.
    pub entries: Vec<PermissionMatrixEntry>,
}

impl AccessControlService {
    /// Builds the permission matrix for the reviewer (trainer) role.
    ///
    /// Resolves the role by its well-known name; a missing role is reported
    /// as [`AppError::RoleNotFound`] so the bulk editor can render "role
    /// missing" instead of crashing.
    pub async fn trainer_permission_matrix(
        &self,
        caller: &CallerIdentity,
    ) -> AppResult<PermissionMatrix> {
        self.require_manage(caller).await?;
        self.role_permission_matrix(SYSTEM_ROLE_TRAINER).await
    }

    async fn role_permission_matrix(&self, role_name: &str) -> AppResult<PermissionMatrix> {
        let role = self
            .repository
            .find_role_by_name(role_name)
            .await?
            .ok_or_else(|| AppError::RoleNotFound(role_name.to_owned()))?;

        let catalog = self.repository.list_permissions().await?;
        let granted: HashSet<PermissionId> = self
            .repository
            .list_role_permissions(role.id)
            .await?
            .into_iter()
            .map(|permission| permission.id)
            .collect();

        let entries = catalog
            .into_iter()
            .map(|permission| PermissionMatrixEntry {
                granted: granted.contains(&permission.id),
                permission,
            })
            .collect();

        Ok(PermissionMatrix { role, entries })
    }
}
