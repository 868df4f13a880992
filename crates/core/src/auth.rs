use serde::{Deserialize, Serialize};

use crate::UserId;

/// Authenticated caller context injected by the transport layer.
///
/// Every privileged operation takes the caller explicitly; the core has no
/// request-scoped globals or ambient authenticated-user lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    user_id: UserId,
    display_name: String,
    email: Option<String>,
}

impl CallerIdentity {
    /// Creates a caller identity from authentication data.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email,
        }
    }

    /// Returns the account identifier of the caller.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the display name for the current caller.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the email, if the provider returned one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
