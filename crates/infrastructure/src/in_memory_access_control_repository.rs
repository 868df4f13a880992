use async_trait::async_trait;
use tokio::sync::RwLock;

use gymgate_application::{
    AccessControlRepository, NewPermission, NewRole, PermissionSync, RoleDelta, RoleUpdate,
};
use gymgate_core::{AppError, AppResult, UserId};
use gymgate_domain::{Permission, PermissionId, Role, RoleId};

/// In-memory access-control store, for tests and local development.
///
/// Binding tables are kept as ordered pair lists so user-role listings come
/// back in assignment order, matching the Postgres adapter's `assigned_at`
/// ordering.
#[derive(Debug, Default)]
pub struct InMemoryAccessControlRepository {
    state: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    permissions: Vec<Permission>,
    roles: Vec<Role>,
    role_permissions: Vec<(RoleId, PermissionId)>,
    user_roles: Vec<(UserId, RoleId)>,
}

impl State {
    fn role(&self, role_id: RoleId) -> AppResult<&Role> {
        self.roles
            .iter()
            .find(|role| role.id == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))
    }

    fn permission(&self, permission_id: PermissionId) -> AppResult<&Permission> {
        self.permissions
            .iter()
            .find(|permission| permission.id == permission_id)
            .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}'")))
    }

    fn role_permission_records(&self, role_id: RoleId) -> Vec<Permission> {
        self.role_permissions
            .iter()
            .filter(|(bound_role, _)| *bound_role == role_id)
            .filter_map(|(_, permission_id)| {
                self.permissions
                    .iter()
                    .find(|permission| permission.id == *permission_id)
                    .cloned()
            })
            .collect()
    }
}

impl InMemoryAccessControlRepository {
    /// Creates an empty access-control store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccessControlRepository for InMemoryAccessControlRepository {
    async fn insert_permission(&self, input: NewPermission) -> AppResult<Permission> {
        let mut state = self.state.write().await;
        if state
            .permissions
            .iter()
            .any(|permission| permission.name == input.name)
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                input.name
            )));
        }

        let permission = Permission {
            id: PermissionId::new(),
            name: input.name,
            display_name: input.display_name,
            category: input.category,
            guard: input.guard,
        };
        state.permissions.push(permission.clone());
        Ok(permission)
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.state.read().await.permissions.clone())
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .state
            .read()
            .await
            .permissions
            .iter()
            .find(|permission| permission.name == name)
            .cloned())
    }

    async fn insert_role(&self, input: NewRole) -> AppResult<Role> {
        let mut state = self.state.write().await;
        if state.roles.iter().any(|role| role.name == input.name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                input.name
            )));
        }

        let role = Role {
            id: RoleId::new(),
            name: input.name,
            display_name: input.display_name,
            description: input.description,
            is_active: true,
            guard: input.guard,
        };
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, role_id: RoleId, update: RoleUpdate) -> AppResult<Role> {
        let mut state = self.state.write().await;

        if let Some(name) = update.name.as_deref()
            && state
                .roles
                .iter()
                .any(|role| role.name == name && role.id != role_id)
        {
            return Err(AppError::Conflict(format!("role '{name}' already exists")));
        }

        let role = state
            .roles
            .iter_mut()
            .find(|role| role.id == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))?;

        if let Some(name) = update.name {
            role.name = name;
        }
        if let Some(display_name) = update.display_name {
            role.display_name = display_name;
        }
        if let Some(description) = update.description {
            role.description = Some(description);
        }
        if let Some(is_active) = update.is_active {
            role.is_active = is_active;
        }
        Ok(role.clone())
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;

        state.roles.retain(|role| role.id != role_id);
        state
            .role_permissions
            .retain(|(bound_role, _)| *bound_role != role_id);
        state
            .user_roles
            .retain(|(_, bound_role)| *bound_role != role_id);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .iter()
            .find(|role| role.id == role_id)
            .cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .iter()
            .find(|role| role.name == name)
            .cloned())
    }

    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<Role>> {
        Ok(self
            .state
            .read()
            .await
            .roles
            .iter()
            .filter(|role| include_inactive || role.is_active)
            .cloned()
            .collect())
    }

    async fn assign_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;
        state.permission(permission_id)?;

        if !state.role_permissions.contains(&(role_id, permission_id)) {
            state.role_permissions.push((role_id, permission_id));
        }
        Ok(())
    }

    async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .role_permissions
            .retain(|binding| *binding != (role_id, permission_id));
        Ok(())
    }

    async fn sync_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<PermissionSync> {
        let mut state = self.state.write().await;
        state.role(role_id)?;

        let before = state.role_permission_records(role_id);

        // A permission listed twice is a single grant.
        let mut unique: Vec<PermissionId> = Vec::with_capacity(permission_ids.len());
        for permission_id in permission_ids {
            if !unique.contains(permission_id) {
                unique.push(*permission_id);
            }
        }

        let mut after = Vec::with_capacity(unique.len());
        for permission_id in &unique {
            after.push(state.permission(*permission_id)?.clone());
        }

        state
            .role_permissions
            .retain(|(bound_role, _)| *bound_role != role_id);
        for permission_id in unique {
            state.role_permissions.push((role_id, permission_id));
        }

        Ok(PermissionSync { before, after })
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        Ok(self.state.read().await.role_permission_records(role_id))
    }

    async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.role(role_id)?;

        if !state.user_roles.contains(&(user_id, role_id)) {
            state.user_roles.push((user_id, role_id));
        }
        Ok(())
    }

    async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state
            .user_roles
            .retain(|binding| *binding != (user_id, role_id));
        Ok(())
    }

    async fn replace_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<RoleDelta> {
        let mut state = self.state.write().await;

        // A role listed twice is a single binding.
        let mut unique: Vec<RoleId> = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            if !unique.contains(role_id) {
                unique.push(*role_id);
            }
        }
        for role_id in &unique {
            state.role(*role_id)?;
        }

        let before: Vec<RoleId> = state
            .user_roles
            .iter()
            .filter(|(bound_user, _)| *bound_user == user_id)
            .map(|(_, role_id)| *role_id)
            .collect();

        let added = unique
            .iter()
            .filter(|role_id| !before.contains(role_id))
            .copied()
            .collect();
        let removed = before
            .iter()
            .filter(|role_id| !unique.contains(role_id))
            .copied()
            .collect();

        state
            .user_roles
            .retain(|(bound_user, _)| *bound_user != user_id);
        for role_id in unique {
            state.user_roles.push((user_id, role_id));
        }

        Ok(RoleDelta { added, removed })
    }

    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state
            .user_roles
            .iter()
            .filter(|(bound_user, _)| *bound_user == user_id)
            .filter_map(|(_, role_id)| {
                state.roles.iter().find(|role| role.id == *role_id).cloned()
            })
            .collect())
    }

    async fn list_users_with_role(&self, role_name: &str) -> AppResult<Vec<UserId>> {
        let state = self.state.read().await;
        let role = state
            .roles
            .iter()
            .find(|role| role.name == role_name)
            .ok_or_else(|| AppError::RoleNotFound(role_name.to_owned()))?;

        Ok(state
            .user_roles
            .iter()
            .filter(|(_, bound_role)| *bound_role == role.id)
            .map(|(user_id, _)| *user_id)
            .collect())
    }

    async fn list_permissions_for_user(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions = Vec::new();
        for (bound_user, role_id) in &state.user_roles {
            if *bound_user == user_id {
                permissions.extend(state.role_permission_records(*role_id));
            }
        }
        Ok(permissions)
    }
}
