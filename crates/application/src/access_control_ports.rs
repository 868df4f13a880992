use async_trait::async_trait;
use gymgate_core::{AppResult, UserId};
use gymgate_domain::{Permission, PermissionId, Role, RoleId};

/// Input payload for seeding or administering permission catalog records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPermission {
    /// Unique machine-readable name.
    pub name: String,
    /// Human-readable name for matrix editors.
    pub display_name: String,
    /// Grouping label for catalog listings.
    pub category: String,
    /// Authorization domain, usually [`gymgate_domain::DEFAULT_GUARD`].
    pub guard: String,
}

/// Input payload for creating roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRole {
    /// Unique machine-readable name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Free-text description shown in administration views.
    pub description: Option<String>,
    /// Authorization domain, usually [`gymgate_domain::DEFAULT_GUARD`].
    pub guard: String,
}

/// Partial update applied to an existing role. `None` fields are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleUpdate {
    /// New unique name.
    pub name: Option<String>,
    /// New display name.
    pub display_name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Before and after sets exposed by a permission sync, for auditability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSync {
    /// Permissions held by the role before the sync.
    pub before: Vec<Permission>,
    /// Permissions held by the role after the sync.
    pub after: Vec<Permission>,
}

/// Delta applied by a bulk replacement of a user's roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDelta {
    /// Roles newly bound to the user.
    pub added: Vec<RoleId>,
    /// Roles removed from the user.
    pub removed: Vec<RoleId>,
}

/// Repository port for the permission catalog, roles, and both binding
/// tables.
///
/// Binding writes are idempotent: assigning an existing pair or revoking an
/// absent one is a no-op, not an error. `sync_role_permissions` and
/// `replace_user_roles` apply their deltas atomically with respect to
/// concurrent readers.
#[async_trait]
pub trait AccessControlRepository: Send + Sync {
    /// Inserts a permission catalog record. Duplicate names are a conflict.
    async fn insert_permission(&self, input: NewPermission) -> AppResult<Permission>;

    /// Lists the full permission catalog.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Finds a permission by its unique name.
    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>>;

    /// Inserts a role. Duplicate names are a conflict.
    async fn insert_role(&self, input: NewRole) -> AppResult<Role>;

    /// Applies a partial update to a role. Renames must stay unique.
    async fn update_role(&self, role_id: RoleId, update: RoleUpdate) -> AppResult<Role>;

    /// Deletes a role and every binding referencing it.
    ///
    /// System-role protection is enforced by the service layer, which loads
    /// the role before deleting it.
    async fn delete_role(&self, role_id: RoleId) -> AppResult<()>;

    /// Finds a role by identity.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Lists roles; inactive roles are included only on request.
    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<Role>>;

    /// Adds a (role, permission) binding; no-op when already present.
    async fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Removes a (role, permission) binding; no-op when absent.
    async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Replaces the role's entire permission set in one atomic step.
    async fn sync_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<PermissionSync>;

    /// Lists the permissions currently bound to a role.
    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>>;

    /// Adds a (user, role) binding; no-op when already present.
    async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()>;

    /// Removes a (user, role) binding; no-op when absent.
    async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()>;

    /// Replaces the user's bound roles with exactly the given set, returning
    /// the applied delta.
    async fn replace_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<RoleDelta>;

    /// Lists roles bound to a user in assignment order. Inactive roles stay
    /// listed until explicitly revoked.
    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>>;

    /// Lists every account currently holding the named role.
    ///
    /// Returns [`gymgate_core::AppError::RoleNotFound`] when the role is
    /// missing from storage, since callers use this for well-known system
    /// roles.
    async fn list_users_with_role(&self, role_name: &str) -> AppResult<Vec<UserId>>;

    /// Lists permissions reachable through every role bound to the user.
    ///
    /// May contain duplicates when a permission is reachable through several
    /// roles; the authorization resolver de-duplicates.
    async fn list_permissions_for_user(&self, user_id: UserId) -> AppResult<Vec<Permission>>;
}
