use super::*;

use gymgate_domain::SYSTEM_ROLE_MEMBER;

impl AccessControlService {
    /// Binds a role to a user; a no-op when already bound.
    pub async fn assign_role_to_user(
        &self,
        caller: &CallerIdentity,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.require_manage(caller).await?;

        self.repository.assign_role_to_user(user_id, role_id).await?;
        info!(user = %user_id, role = %role_id, "role assigned to user");
        Ok(())
    }

    /// Removes a role binding from a user; a no-op when absent.
    pub async fn remove_role_from_user(
        &self,
        caller: &CallerIdentity,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.require_manage(caller).await?;

        self.repository
            .remove_role_from_user(user_id, role_id)
            .await?;
        info!(user = %user_id, role = %role_id, "role removed from user");
        Ok(())
    }

    /// Replaces the user's bound roles with exactly the given set, applying
    /// the add/remove delta in one logical step.
    pub async fn replace_user_roles(
        &self,
        caller: &CallerIdentity,
        user_id: UserId,
        role_ids: &[RoleId],
    ) -> AppResult<RoleDelta> {
        self.require_manage(caller).await?;

        // A role listed twice is a single binding.
        let mut unique: Vec<RoleId> = Vec::with_capacity(role_ids.len());
        for role_id in role_ids {
            if !unique.contains(role_id) {
                unique.push(*role_id);
            }
        }

        let delta = self.repository.replace_user_roles(user_id, &unique).await?;
        info!(
            user = %user_id,
            added = delta.added.len(),
            removed = delta.removed.len(),
            "user roles replaced"
        );
        Ok(delta)
    }

    /// Lists the roles currently bound to a user, in assignment order.
    pub async fn list_roles_for_user(
        &self,
        caller: &CallerIdentity,
        user_id: UserId,
    ) -> AppResult<Vec<Role>> {
        self.require_manage(caller).await?;
        self.repository.list_roles_for_user(user_id).await
    }

    /// Returns full permission records for the user's effective set, for
    /// client-facing permission matrix rendering.
    pub async fn effective_permissions_for_user(
        &self,
        caller: &CallerIdentity,
        user_id: UserId,
    ) -> AppResult<Vec<Permission>> {
        self.require_manage(caller).await?;
        self.authorization.effective_permissions(user_id).await
    }

    /// Returns the legacy single-value role label for an account.
    ///
    /// The many-to-many binding is the authoritative source; this label is a
    /// derived read-only projection (first bound role, falling back to the
    /// base member role) and is never written independently.
    pub async fn primary_role_label(&self, user_id: UserId) -> AppResult<String> {
        let roles = self.repository.list_roles_for_user(user_id).await?;

        Ok(roles
            .into_iter()
            .next()
            .map(|role| role.name)
            .unwrap_or_else(|| SYSTEM_ROLE_MEMBER.to_owned()))
    }
}
