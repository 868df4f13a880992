use super::*;

impl PostgresAccessControlRepository {
    pub(super) async fn assign_role_to_user_impl(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_foreign_key_violation(&error) {
                return AppError::NotFound(format!("role '{role_id}'"));
            }
            AppError::Internal(format!("failed to assign role: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn remove_role_from_user_impl(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove role: {error}")))?;

        Ok(())
    }

    pub(super) async fn replace_user_roles_impl(
        &self,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<RoleDelta> {
        // A role listed twice is a single binding; `ANY($1)` collapses
        // duplicates, so the existence check below needs the deduplicated
        // input as well.
        let mut ids: Vec<uuid::Uuid> = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            let id = role_id.as_uuid();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let mut transaction = begin(&self.pool).await?;

        let known = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM roles
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids.as_slice())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve roles: {error}")))?;

        if known != ids.len() as i64 {
            return Err(AppError::NotFound("one or more roles do not exist".to_owned()));
        }

        let before: Vec<uuid::Uuid> = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT role_id
            FROM user_roles
            WHERE user_id = $1
            ORDER BY assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load current roles: {error}"))
        })?;

        sqlx::query(
            r#"
            DELETE FROM user_roles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear roles: {error}")))?;

        for id in &ids {
            sqlx::query(
                r#"
                INSERT INTO user_roles (user_id, role_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, role_id) DO NOTHING
                "#,
            )
            .bind(user_id.as_uuid())
            .bind(id)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to persist roles: {error}"))
            })?;
        }

        commit(transaction).await?;

        let added = ids
            .iter()
            .filter(|id| !before.contains(id))
            .map(|id| RoleId::from_uuid(*id))
            .collect();
        let removed = before
            .iter()
            .filter(|id| !ids.contains(id))
            .map(|id| RoleId::from_uuid(*id))
            .collect();

        Ok(RoleDelta { added, removed })
    }

    pub(super) async fn list_roles_for_user_impl(&self, user_id: UserId) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT r.id, r.name, r.display_name, r.description, r.is_active, r.guard
            FROM user_roles AS ur
            JOIN roles AS r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY ur.assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?;

        Ok(rows.into_iter().map(Role::from).collect())
    }

    pub(super) async fn list_users_with_role_impl(
        &self,
        role_name: &str,
    ) -> AppResult<Vec<UserId>> {
        let role = self
            .find_role_by_name_impl(role_name)
            .await?
            .ok_or_else(|| AppError::RoleNotFound(role_name.to_owned()))?;

        let rows = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT user_id
            FROM user_roles
            WHERE role_id = $1
            ORDER BY assigned_at
            "#,
        )
        .bind(role.id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role holders: {error}"))
        })?;

        Ok(rows.into_iter().map(UserId::from_uuid).collect())
    }

    pub(super) async fn list_permissions_for_user_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<Permission>> {
        // Duplicates across roles are kept; the authorization resolver
        // de-duplicates.
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT p.id, p.name, p.display_name, p.category, p.guard
            FROM user_roles AS ur
            JOIN role_permissions AS rp ON rp.role_id = ur.role_id
            JOIN permissions AS p ON p.id = rp.permission_id
            WHERE ur.user_id = $1
            ORDER BY ur.assigned_at, rp.assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list user permissions: {error}"))
        })?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }
}
