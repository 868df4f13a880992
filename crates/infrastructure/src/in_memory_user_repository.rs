use async_trait::async_trait;
use tokio::sync::RwLock;

use gymgate_application::UserRepository;
use gymgate_core::{AppResult, UserId};
use gymgate_domain::User;

/// In-memory account store, for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    /// Creates an empty account store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account, replacing any existing account with the same
    /// identifier.
    pub async fn upsert(&self, user: User) {
        let mut users = self.users.write().await;
        users.retain(|existing| existing.id != user.id);
        users.push(user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|user| user.id == user_id)
            .cloned())
    }

    async fn search_users(&self, query: &str) -> AppResult<Vec<User>> {
        let needle = query.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .iter()
            .filter(|user| {
                user.display_name.to_lowercase().contains(needle.as_str())
                    || user.email.as_str().contains(needle.as_str())
            })
            .cloned()
            .collect())
    }
}
