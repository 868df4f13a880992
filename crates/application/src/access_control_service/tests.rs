use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use gymgate_core::{AppError, AppResult, CallerIdentity, UserId};
use gymgate_domain::{
    DEFAULT_GUARD, Permission, PermissionId, Role, RoleId, SYSTEM_ROLE_ADMIN, SYSTEM_ROLE_MEMBER,
    SYSTEM_ROLE_TRAINER, permission_names,
};

use crate::access_control_ports::{
    AccessControlRepository, NewPermission, NewRole, PermissionSync, RoleDelta, RoleUpdate,
};
use crate::authorization_service::AuthorizationService;

use super::AccessControlService;

#[derive(Default)]
struct FakeAccessControlRepository {
    permissions: Mutex<Vec<Permission>>,
    roles: Mutex<Vec<Role>>,
    role_permissions: Mutex<HashMap<RoleId, Vec<Permission>>>,
    user_roles: Mutex<HashMap<UserId, Vec<Role>>>,
    permissions_by_user: HashMap<UserId, Vec<Permission>>,
}

#[async_trait]
impl AccessControlRepository for FakeAccessControlRepository {
    async fn insert_permission(&self, input: NewPermission) -> AppResult<Permission> {
        let permission = Permission {
            id: PermissionId::new(),
            name: input.name,
            display_name: input.display_name,
            category: input.category,
            guard: input.guard,
        };
        self.permissions.lock().await.push(permission.clone());
        Ok(permission)
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.lock().await.clone())
    }

    async fn find_permission_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self
            .permissions
            .lock()
            .await
            .iter()
            .find(|permission| permission.name == name)
            .cloned())
    }

    async fn insert_role(&self, input: NewRole) -> AppResult<Role> {
        let role = Role {
            id: RoleId::new(),
            name: input.name,
            display_name: input.display_name,
            description: input.description,
            is_active: true,
            guard: input.guard,
        };
        self.roles.lock().await.push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, role_id: RoleId, update: RoleUpdate) -> AppResult<Role> {
        let mut roles = self.roles.lock().await;
        let role = roles
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
        self.roles.lock().await.retain(|role| role.id != role_id);
        self.role_permissions.lock().await.remove(&role_id);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.id == role_id)
            .cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.name == name)
            .cloned())
    }

    async fn list_roles(&self, include_inactive: bool) -> AppResult<Vec<Role>> {
        Ok(self
            .roles
            .lock()
            .await
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
        let permission = self
            .permissions
            .lock()
            .await
            .iter()
            .find(|permission| permission.id == permission_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}'")))?;

        let mut bindings = self.role_permissions.lock().await;
        let bound = bindings.entry(role_id).or_default();
        if !bound.iter().any(|existing| existing.id == permission_id) {
            bound.push(permission);
        }
        Ok(())
    }

    async fn revoke_permission_from_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        let mut bindings = self.role_permissions.lock().await;
        if let Some(bound) = bindings.get_mut(&role_id) {
            bound.retain(|permission| permission.id != permission_id);
        }
        Ok(())
    }

    async fn sync_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<PermissionSync> {
        let catalog = self.permissions.lock().await.clone();
        let mut bindings = self.role_permissions.lock().await;
        let before = bindings.get(&role_id).cloned().unwrap_or_default();

        let after: Vec<Permission> = catalog
            .into_iter()
            .filter(|permission| permission_ids.contains(&permission.id))
            .collect();
        bindings.insert(role_id, after.clone());

        Ok(PermissionSync { before, after })
    }

    async fn list_role_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        Ok(self
            .role_permissions
            .lock()
            .await
            .get(&role_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        let role = self
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))?;

        let mut bindings = self.user_roles.lock().await;
        let bound = bindings.entry(user_id).or_default();
        if !bound.iter().any(|existing| existing.id == role_id) {
            bound.push(role);
        }
        Ok(())
    }

    async fn remove_role_from_user(&self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        let mut bindings = self.user_roles.lock().await;
        if let Some(bound) = bindings.get_mut(&user_id) {
            bound.retain(|role| role.id != role_id);
        }
        Ok(())
    }

    async fn replace_user_roles(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<RoleDelta> {
        let roles = self.roles.lock().await.clone();
        let mut bindings = self.user_roles.lock().await;
        let before = bindings.get(&user_id).cloned().unwrap_or_default();

        let after: Vec<Role> = roles
            .into_iter()
            .filter(|role| role_ids.contains(&role.id))
            .collect();

        let added = after
            .iter()
            .filter(|role| !before.iter().any(|existing| existing.id == role.id))
            .map(|role| role.id)
            .collect();
        let removed = before
            .iter()
            .filter(|role| !after.iter().any(|kept| kept.id == role.id))
            .map(|role| role.id)
            .collect();

        bindings.insert(user_id, after);
        Ok(RoleDelta { added, removed })
    }

    async fn list_roles_for_user(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        Ok(self
            .user_roles
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_users_with_role(&self, role_name: &str) -> AppResult<Vec<UserId>> {
        if self.find_role_by_name(role_name).await?.is_none() {
            return Err(AppError::RoleNotFound(role_name.to_owned()));
        }

        let bindings = self.user_roles.lock().await;
        Ok(bindings
            .iter()
            .filter(|(_, roles)| roles.iter().any(|role| role.name == role_name))
            .map(|(user_id, _)| *user_id)
            .collect())
    }

    async fn list_permissions_for_user(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        Ok(self
            .permissions_by_user
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

fn permission(name: &str, category: &str) -> Permission {
    Permission {
        id: PermissionId::new(),
        name: name.to_owned(),
        display_name: name.to_owned(),
        category: category.to_owned(),
        guard: DEFAULT_GUARD.to_owned(),
    }
}

fn role(name: &str) -> Role {
    Role {
        id: RoleId::new(),
        name: name.to_owned(),
        display_name: name.to_owned(),
        description: None,
        is_active: true,
        guard: DEFAULT_GUARD.to_owned(),
    }
}

fn admin_caller() -> (CallerIdentity, Vec<Permission>) {
    let caller = CallerIdentity::new(UserId::new(), "Ada Admin", None);
    let grants = vec![permission(permission_names::ROLES_MANAGE, "access")];
    (caller, grants)
}

fn service_with(repository: FakeAccessControlRepository) -> AccessControlService {
    let repository = Arc::new(repository);
    AccessControlService::new(AuthorizationService::new(repository.clone()), repository)
}

fn new_role(name: &str) -> NewRole {
    NewRole {
        name: name.to_owned(),
        display_name: name.to_owned(),
        description: None,
        guard: DEFAULT_GUARD.to_owned(),
    }
}

#[tokio::test]
async fn operations_are_denied_without_the_manage_permission() {
    let service = service_with(FakeAccessControlRepository::default());
    let caller = CallerIdentity::new(UserId::new(), "Plain Member", None);

    let listed = service.list_permissions(&caller).await;
    assert!(matches!(listed, Err(AppError::Forbidden(_))));

    let created = service.create_role(&caller, new_role("front-desk")).await;
    assert!(matches!(created, Err(AppError::Forbidden(_))));

    let deleted = service.delete_role(&caller, RoleId::new()).await;
    assert!(matches!(deleted, Err(AppError::Forbidden(_))));

    let matrix = service.trainer_permission_matrix(&caller).await;
    assert!(matches!(matrix, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn system_roles_cannot_be_deleted() {
    let (caller, grants) = admin_caller();
    let roles = vec![
        role(SYSTEM_ROLE_MEMBER),
        role(SYSTEM_ROLE_TRAINER),
        role(SYSTEM_ROLE_ADMIN),
        role("front-desk"),
    ];
    let custom_id = roles[3].id;
    let protected_ids: Vec<RoleId> = roles[..3].iter().map(|role| role.id).collect();

    let service = service_with(FakeAccessControlRepository {
        roles: Mutex::new(roles),
        permissions_by_user: HashMap::from([(caller.user_id(), grants)]),
        ..Default::default()
    });

    for role_id in protected_ids {
        let result = service.delete_role(&caller, role_id).await;
        assert!(matches!(result, Err(AppError::ProtectedRole(_))));
    }

    let result = service.delete_role(&caller, custom_id).await;
    assert!(result.is_ok());

    let remaining = service.list_roles(&caller, true).await;
    assert!(matches!(remaining, Ok(roles) if roles.len() == 3));
}

#[tokio::test]
async fn create_role_rejects_blank_names() {
    let (caller, grants) = admin_caller();
    let service = service_with(FakeAccessControlRepository {
        permissions_by_user: HashMap::from([(caller.user_id(), grants)]),
        ..Default::default()
    });

    let result = service.create_role(&caller, new_role("   ")).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn permissions_are_grouped_by_category() {
    let (caller, grants) = admin_caller();
    let service = service_with(FakeAccessControlRepository {
        permissions: Mutex::new(vec![
            permission("roles.manage", "access"),
            permission("subscriptions.review", "subscriptions"),
            permission("subscriptions.manage", "subscriptions"),
        ]),
        permissions_by_user: HashMap::from([(caller.user_id(), grants)]),
        ..Default::default()
    });

    let grouped = service.permissions_by_category(&caller).await;
    assert!(matches!(
        &grouped,
        Ok(groups) if groups.len() == 2
            && groups.get("subscriptions").map(Vec::len) == Some(2)
    ));
}

#[tokio::test]
async fn trainer_matrix_flags_granted_catalog_entries() {
    let (caller, grants) = admin_caller();
    let catalog = vec![
        permission("subscriptions.review", "subscriptions"),
        permission("subscriptions.manage", "subscriptions"),
        permission("members.view", "members"),
    ];
    let granted_id = catalog[0].id;
    let trainer = role(SYSTEM_ROLE_TRAINER);
    let trainer_id = trainer.id;

    let service = service_with(FakeAccessControlRepository {
        permissions: Mutex::new(catalog.clone()),
        roles: Mutex::new(vec![trainer]),
        role_permissions: Mutex::new(HashMap::from([(trainer_id, vec![catalog[0].clone()])])),
        permissions_by_user: HashMap::from([(caller.user_id(), grants)]),
        ..Default::default()
    });

    let matrix = service.trainer_permission_matrix(&caller).await;
    let Ok(matrix) = matrix else {
        panic!("matrix must resolve when the trainer role exists");
    };

    assert_eq!(matrix.role.name, SYSTEM_ROLE_TRAINER);
    assert_eq!(matrix.entries.len(), 3);
    for entry in &matrix.entries {
        assert_eq!(entry.granted, entry.permission.id == granted_id);
    }
}

#[tokio::test]
async fn trainer_matrix_reports_a_missing_trainer_role() {
    let (caller, grants) = admin_caller();
    let service = service_with(FakeAccessControlRepository {
        permissions_by_user: HashMap::from([(caller.user_id(), grants)]),
        ..Default::default()
    });

    let result = service.trainer_permission_matrix(&caller).await;
    assert!(matches!(result, Err(AppError::RoleNotFound(name)) if name == SYSTEM_ROLE_TRAINER));
}

#[tokio::test]
async fn primary_role_label_reads_first_binding_with_member_fallback() {
    let user_id = UserId::new();
    let front_desk = role("front-desk");
    let service = service_with(FakeAccessControlRepository {
        user_roles: Mutex::new(HashMap::from([(user_id, vec![front_desk, role("auditor")])])),
        ..Default::default()
    });

    let label = service.primary_role_label(user_id).await;
    assert!(matches!(label, Ok(name) if name == "front-desk"));

    let fallback = service.primary_role_label(UserId::new()).await;
    assert!(matches!(fallback, Ok(name) if name == SYSTEM_ROLE_MEMBER));
}

#[tokio::test]
async fn sync_reports_the_before_and_after_sets() {
    let (caller, grants) = admin_caller();
    let catalog = vec![
        permission("subscriptions.review", "subscriptions"),
        permission("members.view", "members"),
    ];
    let keep_id = catalog[1].id;
    let trainer = role(SYSTEM_ROLE_TRAINER);
    let trainer_id = trainer.id;

    let service = service_with(FakeAccessControlRepository {
        permissions: Mutex::new(catalog.clone()),
        roles: Mutex::new(vec![trainer]),
        role_permissions: Mutex::new(HashMap::from([(trainer_id, vec![catalog[0].clone()])])),
        permissions_by_user: HashMap::from([(caller.user_id(), grants)]),
        ..Default::default()
    });

    let sync = service
        .sync_role_permissions(&caller, trainer_id, &[keep_id])
        .await;
    assert!(matches!(
        &sync,
        Ok(sync) if sync.before.len() == 1
            && sync.after.len() == 1
            && sync.after[0].id == keep_id
    ));
}
