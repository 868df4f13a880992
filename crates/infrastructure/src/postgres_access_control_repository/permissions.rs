use super::*;

impl PostgresAccessControlRepository {
    pub(super) async fn insert_permission_impl(
        &self,
        input: NewPermission,
    ) -> AppResult<Permission> {
        let id = PermissionId::new();

        sqlx::query(
            r#"
            INSERT INTO permissions (id, name, display_name, category, guard)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id.as_uuid())
        .bind(input.name.as_str())
        .bind(input.display_name.as_str())
        .bind(input.category.as_str())
        .bind(input.guard.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "permission '{}' already exists",
                    input.name
                ));
            }
            AppError::Internal(format!("failed to persist permission: {error}"))
        })?;

        Ok(Permission {
            id,
            name: input.name,
            display_name: input.display_name,
            category: input.category,
            guard: input.guard,
        })
    }

    pub(super) async fn list_permissions_impl(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, display_name, category, guard
            FROM permissions
            ORDER BY category, name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list permissions: {error}")))?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    pub(super) async fn find_permission_by_name_impl(
        &self,
        name: &str,
    ) -> AppResult<Option<Permission>> {
        let row = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, display_name, category, guard
            FROM permissions
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load permission: {error}")))?;

        Ok(row.map(Permission::from))
    }
}
