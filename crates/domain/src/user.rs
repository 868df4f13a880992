use gymgate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

/// Validated email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one
    /// `@`, local part and domain are non-empty, domain contains at least one
    /// `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// A member or staff account as read from the external user-store.
///
/// The legacy single "role" label is not stored on the account; it is a
/// derived projection computed from the user-role binding (first bound role,
/// falling back to the base member role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable account identifier.
    pub id: UserId,
    /// Unique login email.
    pub email: EmailAddress,
    /// Display name shown across clients.
    pub display_name: String,
    /// Opaque credential hash produced by the external user-store.
    pub password_hash: String,
    /// Path-like reference to the profile photo, if one was uploaded.
    pub photo_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::EmailAddress;

    #[test]
    fn email_address_normalizes_case() {
        let email = EmailAddress::new("Member@Example.COM");
        assert!(matches!(email, Ok(value) if value.as_str() == "member@example.com"));
    }

    #[test]
    fn email_address_rejects_missing_domain_dot() {
        assert!(EmailAddress::new("member@localhost").is_err());
    }
}
