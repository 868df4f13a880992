use std::sync::Arc;

use gymgate_core::{AppResult, CallerIdentity, UserId};
use gymgate_domain::{Notification, NotificationId};

use crate::clock::Clock;
use crate::notification_ports::NotificationRepository;

/// Member-facing read surface over durable notification rows.
///
/// Fan-out composition lives in [`crate::NewNotification`] and is persisted
/// by the subscription repository inside the triggering transaction; this
/// service only reads and marks rows.
#[derive(Clone)]
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    /// Creates a notification service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn NotificationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Lists the caller's notifications, newest first.
    pub async fn list_for_user(&self, caller: &CallerIdentity) -> AppResult<Vec<Notification>> {
        self.repository.list_for_user(caller.user_id()).await
    }

    /// Counts the caller's unread notifications.
    pub async fn unread_count(&self, caller: &CallerIdentity) -> AppResult<u64> {
        self.repository.unread_count(caller.user_id()).await
    }

    /// Marks one of the caller's notifications as read.
    pub async fn mark_read(
        &self,
        caller: &CallerIdentity,
        notification_id: NotificationId,
    ) -> AppResult<Notification> {
        self.repository
            .mark_read(caller.user_id(), notification_id, self.clock.now())
            .await
    }

    /// Marks all of the caller's unread notifications as read.
    pub async fn mark_all_read(&self, caller: &CallerIdentity) -> AppResult<u64> {
        self.repository
            .mark_all_read(caller.user_id(), self.clock.now())
            .await
    }

    /// Counts unread notifications for an arbitrary account, for transports
    /// that badge on behalf of a user.
    pub async fn unread_count_for(&self, user_id: UserId) -> AppResult<u64> {
        self.repository.unread_count(user_id).await
    }
}
