use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single authorization domain used by every role and permission.
pub const DEFAULT_GUARD: &str = "api";

/// Name of the base member role. Protected from deletion.
pub const SYSTEM_ROLE_MEMBER: &str = "member";

/// Name of the reviewer role that approves or rejects pending subscriptions.
/// Protected from deletion.
pub const SYSTEM_ROLE_TRAINER: &str = "trainer";

/// Name of the top-level administrator role. Protected from deletion.
pub const SYSTEM_ROLE_ADMIN: &str = "admin";

/// The three reserved role names that can never be deleted.
pub const SYSTEM_ROLE_NAMES: &[&str] = &[SYSTEM_ROLE_MEMBER, SYSTEM_ROLE_TRAINER, SYSTEM_ROLE_ADMIN];

/// Well-known permission names consulted by application policy checks.
pub mod permission_names {
    /// Allows administering roles, permission bindings, and user-role bindings.
    pub const ROLES_MANAGE: &str = "roles.manage";

    /// Allows approving or rejecting pending subscriptions.
    pub const SUBSCRIPTIONS_REVIEW: &str = "subscriptions.review";

    /// Allows creating manual subscriptions and canceling active ones.
    pub const SUBSCRIPTIONS_MANAGE: &str = "subscriptions.manage";
}

/// Unique identifier for a permission catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a role record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named capability in the permission catalog.
///
/// Seeded by deployment tooling, rarely mutated, and never deleted while a
/// role still references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Unique machine-readable name, e.g. `subscriptions.review`.
    pub name: String,
    /// Human-readable name for permission matrix editors.
    pub display_name: String,
    /// Grouping label for catalog listings.
    pub category: String,
    /// Authorization domain the permission belongs to.
    pub guard: String,
}

/// A named, activatable set of permissions assignable to accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique machine-readable name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Free-text description shown in administration views.
    pub description: Option<String>,
    /// Inactive roles are excluded from assignable listings; existing
    /// bindings remain valid until explicitly revoked.
    pub is_active: bool,
    /// Authorization domain the role belongs to.
    pub guard: String,
}

impl Role {
    /// Returns whether a role name is one of the reserved system roles.
    #[must_use]
    pub fn is_system_name(name: &str) -> bool {
        SYSTEM_ROLE_NAMES.contains(&name)
    }

    /// Returns whether this role is a reserved system role.
    #[must_use]
    pub fn is_system(&self) -> bool {
        Self::is_system_name(self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn system_role_names_are_recognized() {
        assert!(Role::is_system_name("member"));
        assert!(Role::is_system_name("trainer"));
        assert!(Role::is_system_name("admin"));
        assert!(!Role::is_system_name("front_desk"));
    }
}
