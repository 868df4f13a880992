use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use gymgate_application::{
    AccessControlRepository, NewPermission, NewRole, PermissionSync, RoleDelta, RoleUpdate,
};
use gymgate_core::{AppError, AppResult, UserId};
use gymgate_domain::{Permission, PermissionId, Role, RoleId};

mod permissions;
mod roles;
mod user_roles;

/// PostgreSQL-backed store for the permission catalog, roles, and bindings.
///
/// Binding rows carry an `assigned_at` stamped with `clock_timestamp()` so
/// listings come back in assignment order even when several bindings are
/// written in one transaction.
#[derive(Clone)]
pub struct PostgresAccessControlRepository {
    pool: PgPool,
}

impl PostgresAccessControlRepository {
    /// Creates an access-control repository with the provided connection
    /// pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    name: String,
    display_name: String,
    category: String,
    guard: String,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            id: PermissionId::from_uuid(row.id),
            name: row.name,
            display_name: row.display_name,
            category: row.category,
            guard: row.guard,
        }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    display_name: String,
    description: Option<String>,
    is_active: bool,
    guard: String,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: RoleId::from_uuid(row.id),
            name: row.name,
            display_name: row.display_name,
            description: row.description,
            is_active: row.is_active,
            guard: row.guard,
        }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db_error| db_error.is_unique_violation())
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db_error| db_error.is_foreign_key_violation())
}

async fn begin(pool: &PgPool) -> AppResult<Transaction<'_, Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

#[async_trait]
impl AccessControlRepository for PostgresAccessControlRepository {
    async fn insert_permission(&self, input: NewPermission) -> AppResult<Permission> {
        self.insert_permission_impl(input).await
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl().await
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        self.find_permission_by_name_impl(name).await
    }

    async fn insert_role(&self, input: NewRole) -> AppResult<Role> {
        self.insert_role_impl(input).await
    }

    async fn update_role(&self, role_id: RoleId, update: RoleUpdate) -> AppResult<Role> {
        self.update_role_impl(role_id, update).await
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        self.delete_role_impl(role_id).await
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        self.find_role_impl(role_id).await
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.find_role_by_name_impl(name).await
    }

    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<Role>> {
        self.list_roles_impl(include_inactive).await
    }

    async fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.assign_permission_to_role_impl(role_id, permission_id)
            .await
    }

    async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.revoke_permission_from_role_impl(role_id, permission_id)
            .await
    }

    async fn sync_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<PermissionSync> {
        self.sync_role_permissions_impl(role_id, permission_ids)
            .await
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        self.list_role_permissions_impl(role_id).await
    }

    async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        self.assign_role_to_user_impl(user_id, role_id).await
    }

    async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        self.remove_role_from_user_impl(user_id, role_id).await
    }

    async fn replace_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<RoleDelta> {
        self.replace_user_roles_impl(user_id, role_ids).await
    }

    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        self.list_roles_for_user_impl(user_id).await
    }

    async fn list_users_with_role(&self, role_name: &str) -> AppResult<Vec<UserId>> {
        self.list_users_with_role_impl(role_name).await
    }

    async fn list_permissions_for_user(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        self.list_permissions_for_user_impl(user_id).await
    }
}
