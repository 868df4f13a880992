use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use gymgate_application::{
    NewNotification, NotificationRepository, SubscriptionApproval, SubscriptionFilter,
    SubscriptionRepository,
};
use gymgate_core::{AppError, AppResult, UserId};
use gymgate_domain::{Subscription, SubscriptionId, SubscriptionStatus};

use crate::in_memory_notification_repository::InMemoryNotificationRepository;

/// In-memory subscription store, for tests and local development.
///
/// Every transition runs inside one mutex critical section and appends its
/// fan-out to the shared notification store before releasing the lock, which
/// mirrors the transactional contract of the Postgres adapter: the
/// status checks in `approve_pending` and `reject_pending` cannot interleave,
/// and a transition is never visible without its notifications.
pub struct InMemorySubscriptionRepository {
    rows: Mutex<Vec<Subscription>>,
    notifications: Arc<InMemoryNotificationRepository>,
}

impl InMemorySubscriptionRepository {
    /// Creates an empty store writing fan-out into the given notification
    /// store.
    #[must_use]
    pub fn new(notifications: Arc<InMemoryNotificationRepository>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            notifications,
        }
    }

    async fn persist_fanout(&self, fanout: Vec<NewNotification>) -> AppResult<()> {
        if fanout.is_empty() {
            return Ok(());
        }
        self.notifications.insert_many(fanout).await
    }

    // An active row is refused when the user already holds one, regardless of
    // the insert path, matching the partial unique index in the Postgres
    // adapter.
    async fn insert_row(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut rows = self.rows.lock().await;
        if subscription.status == SubscriptionStatus::Active
            && rows.iter().any(|row| {
                row.user_id == subscription.user_id && row.status == SubscriptionStatus::Active
            })
        {
            return Err(AppError::DuplicateActiveSubscription(format!(
                "user '{}' already holds an active subscription",
                subscription.user_id
            )));
        }

        rows.push(subscription.clone());
        self.persist_fanout(fanout).await?;
        Ok(subscription)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn insert(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        self.insert_row(subscription, fanout).await
    }

    async fn insert_exclusive_active(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        self.insert_row(subscription, fanout).await
    }

    async fn find(&self, subscription_id: SubscriptionId) -> AppResult<Option<Subscription>> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| row.id == subscription_id)
            .cloned())
    }

    async fn current_for_user(&self, user_id: UserId) -> AppResult<Option<Subscription>> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .filter(|row| {
                row.user_id == user_id
                    && matches!(
                        row.status,
                        SubscriptionStatus::Pending | SubscriptionStatus::Active
                    )
            })
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn list(&self, filter: SubscriptionFilter) -> AppResult<Vec<Subscription>> {
        let rows = self.rows.lock().await;
        let mut listed: Vec<Subscription> = rows
            .iter()
            .filter(|row| filter.status.is_none_or(|status| row.status == status))
            .filter(|row| filter.plan_id.is_none_or(|plan_id| row.plan_id == plan_id))
            .filter(|row| {
                filter
                    .user_ids
                    .as_ref()
                    .is_none_or(|user_ids| user_ids.contains(&row.user_id))
            })
            .cloned()
            .collect();
        listed.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(listed)
    }

    async fn attach_receipt_pending(
        &self,
        subscription_id: SubscriptionId,
        receipt_path: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == subscription_id)
            .ok_or_else(|| AppError::NotFound(format!("subscription '{subscription_id}'")))?;

        row.receipt_path = Some(receipt_path.to_owned());
        row.status = SubscriptionStatus::Pending;
        let updated = row.clone();

        self.persist_fanout(fanout).await?;
        Ok(updated)
    }

    async fn approve_pending(
        &self,
        subscription_id: SubscriptionId,
        approval: SubscriptionApproval,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == subscription_id)
            .ok_or_else(|| AppError::NotFound(format!("subscription '{subscription_id}'")))?;

        if row.status != SubscriptionStatus::Pending {
            return Err(AppError::InvalidState {
                reason: "only pending subscriptions can be approved".to_owned(),
                current: row.status.as_str().to_owned(),
            });
        }

        row.status = SubscriptionStatus::Active;
        row.approved_at = Some(approval.approved_at);
        row.approved_by = Some(approval.approved_by);
        row.starts_at = Some(approval.starts_at);
        row.ends_at = Some(approval.ends_at);
        let updated = row.clone();

        self.persist_fanout(fanout).await?;
        Ok(updated)
    }

    async fn reject_pending(
        &self,
        subscription_id: SubscriptionId,
        reason: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.id == subscription_id)
            .ok_or_else(|| AppError::NotFound(format!("subscription '{subscription_id}'")))?;

        if row.status != SubscriptionStatus::Pending {
            return Err(AppError::InvalidState {
                reason: "only pending subscriptions can be rejected".to_owned(),
                current: row.status.as_str().to_owned(),
            });
        }

        row.status = SubscriptionStatus::Rejected;
        row.rejection_reason = Some(reason.to_owned());
        let updated = row.clone();

        self.persist_fanout(fanout).await?;
        Ok(updated)
    }

    async fn cancel_active_for_user(
        &self,
        user_id: UserId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        let mut rows = self.rows.lock().await;
        let row = rows
            .iter_mut()
            .find(|row| row.user_id == user_id && row.status == SubscriptionStatus::Active)
            .ok_or_else(|| {
                AppError::NotFound(format!("no active subscription for user '{user_id}'"))
            })?;

        row.status = SubscriptionStatus::Canceled;
        row.ends_at = Some(ends_at);
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests;
