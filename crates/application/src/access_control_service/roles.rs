use super::*;

impl AccessControlService {
    /// Returns the full permission catalog for administrative callers.
    pub async fn list_permissions(&self, caller: &CallerIdentity) -> AppResult<Vec<Permission>> {
        self.require_manage(caller).await?;
        self.repository.list_permissions().await
    }

    /// Returns the permission catalog grouped by category.
    pub async fn permissions_by_category(
        &self,
        caller: &CallerIdentity,
    ) -> AppResult<BTreeMap<String, Vec<Permission>>> {
        self.require_manage(caller).await?;

        let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
        for permission in self.repository.list_permissions().await? {
            grouped
                .entry(permission.category.clone())
                .or_default()
                .push(permission);
        }

        Ok(grouped)
    }

    /// Creates a role. Role names must be unique.
    pub async fn create_role(&self, caller: &CallerIdentity, input: NewRole) -> AppResult<Role> {
        self.require_manage(caller).await?;

        let NewRole {
            name,
            display_name,
            description,
            guard,
        } = input;
        let name = NonEmptyString::new(name)?;

        let role = self
            .repository
            .insert_role(NewRole {
                name: name.into(),
                display_name,
                description,
                guard,
            })
            .await?;

        info!(role = role.name, "role created");
        Ok(role)
    }

    /// Applies a partial update to a role: rename (subject to uniqueness) or
    /// toggle the active flag.
    ///
    /// Deactivating a role removes it from assignable listings but leaves
    /// existing bindings valid until explicitly revoked.
    pub async fn update_role(
        &self,
        caller: &CallerIdentity,
        role_id: RoleId,
        update: RoleUpdate,
    ) -> AppResult<Role> {
        self.require_manage(caller).await?;

        let role = self.repository.update_role(role_id, update).await?;
        info!(role = role.name, "role updated");
        Ok(role)
    }

    /// Deletes a role and its bindings.
    ///
    /// The three reserved system roles can never be deleted.
    pub async fn delete_role(&self, caller: &CallerIdentity, role_id: RoleId) -> AppResult<()> {
        self.require_manage(caller).await?;

        let role = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))?;

        if role.is_system() {
            return Err(AppError::ProtectedRole(format!(
                "system role '{}' cannot be deleted",
                role.name
            )));
        }

        self.repository.delete_role(role_id).await?;
        info!(role = role.name, "role deleted");
        Ok(())
    }

    /// Lists roles for administrative views. Inactive roles are excluded
    /// from the assignable listing unless requested.
    pub async fn list_roles(
        &self,
        caller: &CallerIdentity,
        include_inactive: bool,
    ) -> AppResult<Vec<Role>> {
        self.require_manage(caller).await?;
        self.repository.list_roles(include_inactive).await
    }

    /// Adds a permission to a role; a no-op when already assigned.
    pub async fn assign_permission(
        &self,
        caller: &CallerIdentity,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.require_manage(caller).await?;

        self.repository
            .assign_permission_to_role(role_id, permission_id)
            .await?;

        info!(role = %role_id, permission = %permission_id, "permission assigned");
        Ok(())
    }

    /// Removes a permission from a role; a no-op when absent.
    pub async fn revoke_permission(
        &self,
        caller: &CallerIdentity,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.require_manage(caller).await?;

        self.repository
            .revoke_permission_from_role(role_id, permission_id)
            .await?;

        info!(role = %role_id, permission = %permission_id, "permission revoked");
        Ok(())
    }

    /// Replaces a role's entire permission set in one atomic step.
    ///
    /// Preferred over per-permission toggles for bulk matrix edits: one sync
    /// call cannot interleave with a concurrent editor into a partial set.
    pub async fn sync_role_permissions(
        &self,
        caller: &CallerIdentity,
        role_id: RoleId,
        permission_ids: &[PermissionId],
    ) -> AppResult<PermissionSync> {
        self.require_manage(caller).await?;

        // A permission listed twice is a single grant.
        let mut unique: Vec<PermissionId> = Vec::with_capacity(permission_ids.len());
        for permission_id in permission_ids {
            if !unique.contains(permission_id) {
                unique.push(*permission_id);
            }
        }

        let sync = self
            .repository
            .sync_role_permissions(role_id, &unique)
            .await?;

        info!(
            role = %role_id,
            before = sync.before.len(),
            after = sync.after.len(),
            "role permissions synced"
        );
        Ok(sync)
    }

    /// Lists the permissions currently bound to a role.
    pub async fn list_role_permissions(
        &self,
        caller: &CallerIdentity,
        role_id: RoleId,
    ) -> AppResult<Vec<Permission>> {
        self.require_manage(caller).await?;
        self.repository.list_role_permissions(role_id).await
    }
}
