use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gymgate_core::{AppError, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subscription::{SubscriptionId, SubscriptionStatus};

/// Unique identifier for a notification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random notification identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a notification identifier from an existing UUID value.
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

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for NotificationId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Type tag carried by every notification row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A transfer receipt was uploaded and awaits review.
    SubscriptionRequest,
    /// A subscription became active.
    SubscriptionApproved,
    /// A pending subscription was rejected.
    SubscriptionRejected,
}

impl NotificationKind {
    /// Returns a stable storage value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionRequest => "subscription_request",
            Self::SubscriptionApproved => "subscription_approved",
            Self::SubscriptionRejected => "subscription_rejected",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "subscription_request" => Ok(Self::SubscriptionRequest),
            "subscription_approved" => Ok(Self::SubscriptionApproved),
            "subscription_rejected" => Ok(Self::SubscriptionRejected),
            _ => Err(AppError::Validation(format!(
                "unknown notification kind '{value}'"
            ))),
        }
    }
}

/// Structured payload carried alongside the human-readable message.
///
/// Holds enough context for a client to render the notification without a
/// follow-up fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    /// Subject subscription.
    pub subscription_id: SubscriptionId,
    /// Plan name at the time of the event.
    pub plan_name: String,
    /// Price in cents snapshotted on the subscription.
    pub price_cents: i64,
    /// Subscription status resulting from the event.
    pub status: SubscriptionStatus,
}

/// A durable, per-recipient message produced by lifecycle fan-out.
///
/// Immutable once created except for the read timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Stable notification identifier.
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
    /// Read timestamp; `None` means unread.
    pub read_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Returns whether the notification has not been read yet.
    #[must_use]
    pub fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }
}
