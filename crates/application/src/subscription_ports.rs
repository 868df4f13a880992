use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gymgate_core::{AppResult, UserId};
use gymgate_domain::{
    PlanId, Subscription, SubscriptionId, SubscriptionPlan, SubscriptionStatus, User,
};

use crate::notification_ports::NewNotification;

/// Timestamps and approver applied by a successful approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionApproval {
    /// Reviewer who approved.
    pub approved_by: UserId,
    /// Approval instant.
    pub approved_at: DateTime<Utc>,
    /// Membership start, computed from the plan at approval time.
    pub starts_at: DateTime<Utc>,
    /// Membership end, computed from the plan at approval time.
    pub ends_at: DateTime<Utc>,
}

/// Filters for the administrative subscription listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    /// Restrict to one lifecycle status.
    pub status: Option<SubscriptionStatus>,
    /// Restrict to one plan.
    pub plan_id: Option<PlanId>,
    /// Restrict to these purchasers (resolved from a user search upstream).
    pub user_ids: Option<Vec<UserId>>,
}

/// Repository port for subscription rows and their lifecycle transitions.
///
/// Transition methods take the pre-composed notification rows and persist
/// transition and fan-out in one storage transaction, so a crash can never
/// leave a transitioned subscription with its notifications silently lost.
/// `approve_pending` and `reject_pending` are conditional updates on status
/// (compare-and-swap): of two concurrent calls against the same pending
/// subscription exactly one succeeds and the other observes
/// [`gymgate_core::AppError::InvalidState`] with the current status.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Inserts a subscription and any creation-time fan-out atomically.
    async fn insert(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription>;

    /// Inserts an active subscription, failing with
    /// [`gymgate_core::AppError::DuplicateActiveSubscription`] when the user
    /// already holds an active one. The check and insert are race-safe
    /// (unique constraint or serializing lock, depending on the adapter).
    async fn insert_exclusive_active(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription>;

    /// Finds a subscription by identity.
    async fn find(&self, subscription_id: SubscriptionId) -> AppResult<Option<Subscription>>;

    /// Returns the user's current subscription: the most recently created
    /// row that is pending or active, if any.
    async fn current_for_user(&self, user_id: UserId) -> AppResult<Option<Subscription>>;

    /// Lists subscriptions matching the filter, newest first.
    async fn list(&self, filter: SubscriptionFilter) -> AppResult<Vec<Subscription>>;

    /// Stores a transfer receipt reference, re-asserts pending status, and
    /// persists the reviewer fan-out atomically.
    async fn attach_receipt_pending(
        &self,
        subscription_id: SubscriptionId,
        receipt_path: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription>;

    /// Approves a pending subscription (conditional on status) and persists
    /// the purchaser notification atomically.
    async fn approve_pending(
        &self,
        subscription_id: SubscriptionId,
        approval: SubscriptionApproval,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription>;

    /// Rejects a pending subscription (conditional on status) with a reason
    /// and persists the purchaser notification atomically.
    async fn reject_pending(
        &self,
        subscription_id: SubscriptionId,
        reason: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription>;

    /// Cancels the user's active subscription, stamping its end date.
    ///
    /// Returns [`gymgate_core::AppError::NotFound`] when the user holds no
    /// active subscription.
    async fn cancel_active_for_user(
        &self,
        user_id: UserId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<Subscription>;
}

/// Read-only port over the plan catalog.
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Finds a plan by identity.
    async fn find_plan(&self, plan_id: PlanId) -> AppResult<Option<SubscriptionPlan>>;

    /// Lists plans; inactive plans are included only on request.
    async fn list_plans(&self, include_inactive: bool) -> AppResult<Vec<SubscriptionPlan>>;
}

/// Read-only port over the external user-store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds an account by identity.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>>;

    /// Case-insensitive substring search over display names and emails.
    async fn search_users(&self, query: &str) -> AppResult<Vec<User>>;
}
