//! Idempotent seeding of the permission catalog and system roles.
//!
//! Run by deployment tooling before the first request. The well-known roles
//! seeded here are the ones `AppError::RoleNotFound` reports as missing when
//! a deployment skipped this step.

use gymgate_core::AppResult;
use gymgate_domain::{
    DEFAULT_GUARD, Permission, Role, SYSTEM_ROLE_ADMIN, SYSTEM_ROLE_MEMBER, SYSTEM_ROLE_TRAINER,
    permission_names,
};
use tracing::info;

use crate::access_control_ports::{AccessControlRepository, NewPermission, NewRole};

const CATALOG: &[(&str, &str, &str)] = &[
    (
        permission_names::ROLES_MANAGE,
        "Manage roles and permissions",
        "access",
    ),
    (
        permission_names::SUBSCRIPTIONS_REVIEW,
        "Approve or reject subscriptions",
        "billing",
    ),
    (
        permission_names::SUBSCRIPTIONS_MANAGE,
        "Create and cancel subscriptions",
        "billing",
    ),
    ("members.view", "View member profiles", "members"),
    ("members.manage", "Manage member profiles", "members"),
    ("plans.manage", "Manage subscription plans", "billing"),
];

const SYSTEM_ROLES: &[(&str, &str, &str)] = &[
    (SYSTEM_ROLE_MEMBER, "Member", "Base role held by every member"),
    (
        SYSTEM_ROLE_TRAINER,
        "Trainer",
        "Reviews pending subscription requests",
    ),
    (
        SYSTEM_ROLE_ADMIN,
        "Administrator",
        "Top-level administration",
    ),
];

const TRAINER_GRANTS: &[&str] = &[permission_names::SUBSCRIPTIONS_REVIEW, "members.view"];

/// Seeds the permission catalog, the three system roles, and their default
/// grants: the administrator role receives the full catalog, the trainer role
/// the review grants. Safe to run repeatedly.
pub async fn ensure_system_catalog(repository: &dyn AccessControlRepository) -> AppResult<()> {
    for (name, display_name, category) in CATALOG {
        ensure_permission(repository, name, display_name, category).await?;
    }

    for (name, display_name, description) in SYSTEM_ROLES {
        ensure_role(repository, name, display_name, description).await?;
    }

    let catalog = repository.list_permissions().await?;

    if let Some(admin) = repository.find_role_by_name(SYSTEM_ROLE_ADMIN).await? {
        for permission in &catalog {
            repository
                .assign_permission_to_role(admin.id, permission.id)
                .await?;
        }
    }

    if let Some(trainer) = repository.find_role_by_name(SYSTEM_ROLE_TRAINER).await? {
        for permission in catalog
            .iter()
            .filter(|permission| TRAINER_GRANTS.contains(&permission.name.as_str()))
        {
            repository
                .assign_permission_to_role(trainer.id, permission.id)
                .await?;
        }
    }

    info!("system catalog seeded");
    Ok(())
}

async fn ensure_permission(
    repository: &dyn AccessControlRepository,
    name: &str,
    display_name: &str,
    category: &str,
) -> AppResult<Permission> {
    if let Some(existing) = repository.find_permission_by_name(name).await? {
        return Ok(existing);
    }

    repository
        .insert_permission(NewPermission {
            name: name.to_owned(),
            display_name: display_name.to_owned(),
            category: category.to_owned(),
            guard: DEFAULT_GUARD.to_owned(),
        })
        .await
}

async fn ensure_role(
    repository: &dyn AccessControlRepository,
    name: &str,
    display_name: &str,
    description: &str,
) -> AppResult<Role> {
    if let Some(existing) = repository.find_role_by_name(name).await? {
        return Ok(existing);
    }

    repository
        .insert_role(NewRole {
            name: name.to_owned(),
            display_name: display_name.to_owned(),
            description: Some(description.to_owned()),
            guard: DEFAULT_GUARD.to_owned(),
        })
        .await
}
