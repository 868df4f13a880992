use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use gymgate_application::{NewNotification, NotificationRepository};
use gymgate_core::{AppError, AppResult, UserId};
use gymgate_domain::{Notification, NotificationId};

/// In-memory notification store, for tests and local development.
///
/// The in-memory subscription repository shares one instance of this store so
/// that lifecycle fan-out lands where the notification read surface looks.
#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    rows: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    /// Creates an empty notification store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn materialize(row: NewNotification) -> Notification {
    Notification {
        id: row.id,
        recipient: row.recipient,
        kind: row.kind,
        title: row.title,
        message: row.message,
        payload: row.payload,
        read_at: None,
        created_at: row.created_at,
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert_many(&self, notifications: Vec<NewNotification>) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        rows.extend(notifications.into_iter().map(materialize));
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let mut listed: Vec<Notification> = rows
            .iter()
            .filter(|row| row.recipient == user_id)
            .cloned()
            .collect();
        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(listed)
    }

    async fn unread_count(&self, user_id: UserId) -> AppResult<u64> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|row| row.recipient == user_id && row.is_unread())
            .count() as u64)
    }

    async fn mark_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
        read_at: DateTime<Utc>,
    ) -> AppResult<Notification> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == notification_id && row.recipient == user_id)
            .ok_or_else(|| AppError::NotFound(format!("notification '{notification_id}'")))?;

        if row.read_at.is_none() {
            row.read_at = Some(read_at);
        }
        Ok(row.clone())
    }

    async fn mark_all_read(&self, user_id: UserId, read_at: DateTime<Utc>) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let mut updated = 0;
        for row in rows
            .iter_mut()
            .filter(|row| row.recipient == user_id && row.read_at.is_none())
        {
            row.read_at = Some(read_at);
            updated += 1;
        }
        Ok(updated)
    }
}
