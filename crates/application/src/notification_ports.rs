use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gymgate_core::{AppResult, UserId};
use gymgate_domain::{
    Notification, NotificationId, NotificationKind, NotificationPayload, Subscription,
    SubscriptionPlan, SubscriptionStatus,
};

/// A notification row prepared by fan-out, ready for durable insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Pre-generated identifier so payloads can reference it before insert.
    pub id: NotificationId,
    /// Receiving account.
    pub recipient: UserId,
    /// Type tag for client-side routing.
    pub kind: NotificationKind,
    /// Short human-readable title.
    pub title: String,
    /// Human-readable message body.
    pub message: String,
    /// Structured event context.
    pub payload: NotificationPayload,
    /// Creation timestamp stamped by the triggering service.
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    /// Composes the purchaser confirmation emitted when a subscription
    /// becomes active.
    #[must_use]
    pub fn subscription_approved(
        subscription: &Subscription,
        plan: &SubscriptionPlan,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient: subscription.user_id,
            kind: NotificationKind::SubscriptionApproved,
            title: "Subscription approved".to_owned(),
            message: format!("Your {} membership is now active.", plan.name),
            payload: payload_for(subscription, plan, SubscriptionStatus::Active),
            created_at,
        }
    }

    /// Composes the purchaser notice emitted when a pending subscription is
    /// rejected.
    #[must_use]
    pub fn subscription_rejected(
        subscription: &Subscription,
        plan: &SubscriptionPlan,
        reason: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient: subscription.user_id,
            kind: NotificationKind::SubscriptionRejected,
            title: "Subscription rejected".to_owned(),
            message: format!(
                "Your {} subscription request was rejected: {reason}",
                plan.name
            ),
            payload: payload_for(subscription, plan, SubscriptionStatus::Rejected),
            created_at,
        }
    }

    /// Composes one reviewer notice for an uploaded transfer receipt.
    #[must_use]
    pub fn subscription_request(
        reviewer: UserId,
        member_name: &str,
        subscription: &Subscription,
        plan: &SubscriptionPlan,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            recipient: reviewer,
            kind: NotificationKind::SubscriptionRequest,
            title: "New subscription request".to_owned(),
            message: format!(
                "{member_name} uploaded a transfer receipt for the {} plan.",
                plan.name
            ),
            payload: payload_for(subscription, plan, SubscriptionStatus::Pending),
            created_at,
        }
    }
}

fn payload_for(
    subscription: &Subscription,
    plan: &SubscriptionPlan,
    status: SubscriptionStatus,
) -> NotificationPayload {
    NotificationPayload {
        subscription_id: subscription.id,
        plan_name: plan.name.clone(),
        price_cents: subscription.price_cents,
        status,
    }
}

/// Repository port for durable notification rows.
///
/// Rows created by lifecycle fan-out are inserted by the subscription
/// repository inside the triggering transaction; this port covers standalone
/// insertion and the member-facing read surface.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Inserts a batch of notification rows as one unit of work.
    async fn insert_many(&self, notifications: Vec<NewNotification>) -> AppResult<()>;

    /// Lists a user's notifications, newest first.
    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Notification>>;

    /// Counts a user's unread notifications.
    async fn unread_count(&self, user_id: UserId) -> AppResult<u64>;

    /// Marks one of the user's notifications as read.
    ///
    /// Scoped to the recipient: a notification addressed to someone else is
    /// reported as not found rather than being discoverable. Already-read
    /// rows keep their original read timestamp.
    async fn mark_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
        read_at: DateTime<Utc>,
    ) -> AppResult<Notification>;

    /// Marks all of the user's unread notifications as read, returning the
    /// number of rows updated.
    async fn mark_all_read(&self, user_id: UserId, read_at: DateTime<Utc>) -> AppResult<u64>;
}
