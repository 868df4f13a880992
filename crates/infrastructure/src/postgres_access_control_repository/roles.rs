use super::*;

impl PostgresAccessControlRepository {
    pub(super) async fn insert_role_impl(&self, input: NewRole) -> AppResult<Role> {
        let id = RoleId::new();

        sqlx::query(
            r#"
            INSERT INTO roles (id, name, display_name, description, is_active, guard)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            "#,
        )
        .bind(id.as_uuid())
        .bind(input.name.as_str())
        .bind(input.display_name.as_str())
        .bind(input.description.as_deref())
        .bind(input.guard.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!("role '{}' already exists", input.name));
            }
            AppError::Internal(format!("failed to persist role: {error}"))
        })?;

        Ok(Role {
            id,
            name: input.name,
            display_name: input.display_name,
            description: input.description,
            is_active: true,
            guard: input.guard,
        })
    }

    pub(super) async fn update_role_impl(
        &self,
        role_id: RoleId,
        update: RoleUpdate,
    ) -> AppResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            UPDATE roles
            SET name = COALESCE($2, name),
                display_name = COALESCE($3, display_name),
                description = COALESCE($4, description),
                is_active = COALESCE($5, is_active)
            WHERE id = $1
            RETURNING id, name, display_name, description, is_active, guard
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(update.name.as_deref())
        .bind(update.display_name.as_deref())
        .bind(update.description.as_deref())
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "role '{}' already exists",
                    update.name.as_deref().unwrap_or_default()
                ));
            }
            AppError::Internal(format!("failed to update role: {error}"))
        })?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))?;

        Ok(Role::from(row))
    }

    pub(super) async fn delete_role_impl(&self, role_id: RoleId) -> AppResult<()> {
        // Binding rows go with the role via ON DELETE CASCADE.
        let result = sqlx::query(
            r#"
            DELETE FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete role: {error}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}'")));
        }
        Ok(())
    }

    pub(super) async fn find_role_impl(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, description, is_active, guard
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        Ok(row.map(Role::from))
    }

    pub(super) async fn find_role_by_name_impl(&self, name: &str) -> AppResult<Option<Role>> {
        let row = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, description, is_active, guard
            FROM roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load role: {error}")))?;

        Ok(row.map(Role::from))
    }

    pub(super) async fn list_roles_impl(&self, include_inactive: bool) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, description, is_active, guard
            FROM roles
            WHERE is_active OR $1
            ORDER BY name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    pub(super) async fn assign_permission_to_role_impl(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                return AppError::NotFound(format!(
                    "role '{role_id}' or permission '{permission_id}'"
                ));
            }
            AppError::Internal(format!("failed to assign permission: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn revoke_permission_from_role_impl(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1 AND permission_id = $2
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to revoke permission: {error}")))?;

        Ok(())
    }

    pub(super) async fn sync_role_permissions_impl(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<PermissionSync> {
        // A permission listed twice is a single grant; `ANY($1)` collapses
        // duplicates, so the existence check below needs the deduplicated
        // input as well.
        let mut ids: Vec<uuid::Uuid> = Vec::with_capacity(permission_ids.len());
        for permission_id in permission_ids {
            let id = permission_id.as_uuid();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let mut transaction = begin(&self.pool).await?;

        let before = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT p.id, p.name, p.display_name, p.category, p.guard
            FROM role_permissions AS rp
            JOIN permissions AS p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY rp.assigned_at
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load current grants: {error}"))
        })?;

        let after = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, display_name, category, guard
            FROM permissions
            WHERE id = ANY($1)
            ORDER BY array_position($1, id)
            "#,
        )
        .bind(ids.as_slice())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve target grants: {error}"))
        })?;

        if after.len() != ids.len() {
            return Err(AppError::NotFound(
                "one or more permissions do not exist".to_owned(),
            ));
        }

        sqlx::query(
            r#"
            DELETE FROM role_permissions
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear grants: {error}")))?;

        for id in &ids {
            sqlx::query(
                r#"
                INSERT INTO role_permissions (role_id, permission_id)
                VALUES ($1, $2)
                ON CONFLICT (role_id, permission_id) DO NOTHING
                "#,
            )
            .bind(role_id.as_uuid())
            .bind(id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                if is_foreign_key_violation(&error) {
                    return AppError::NotFound(format!("role '{role_id}'"));
                }
                AppError::Internal(format!("failed to persist grants: {error}"))
            })?;
        }

        commit(transaction).await?;

        Ok(PermissionSync {
            before: before.into_iter().map(Permission::from).collect(),
            after: after.into_iter().map(Permission::from).collect(),
        })
    }

    pub(super) async fn list_role_permissions_impl(
        &self,
        role_id: RoleId,
    ) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT p.id, p.name, p.display_name, p.category, p.guard
            FROM role_permissions AS rp
            JOIN permissions AS p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY rp.assigned_at
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role permissions: {error}"))
        })?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }
}
