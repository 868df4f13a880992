use std::sync::Arc;

use chrono::{DateTime, Months, TimeDelta, Utc};
use gymgate_core::{AppError, AppResult, CallerIdentity, UserId};
use gymgate_domain::{
    PlanId, Subscription, SubscriptionId, SubscriptionPlan, SubscriptionStatus, permission_names,
};
use tracing::info;

use crate::access_control_ports::AccessControlRepository;
use crate::authorization_service::AuthorizationService;
use crate::clock::Clock;
use crate::notification_ports::NewNotification;
use crate::subscription_ports::{
    PlanRepository, SubscriptionApproval, SubscriptionFilter, SubscriptionRepository,
    UserRepository,
};

mod create;
mod review;

/// Reason stored when a reviewer rejects without supplying one.
pub const DEFAULT_REJECTION_REASON: &str = "Your subscription request was not approved.";

/// Fixed membership length for reviewer-initiated manual subscriptions.
///
/// Deliberately not plan-duration-based: manual grants are a staff courtesy
/// window, not a purchased term.
const MANUAL_DURATION_DAYS: i64 = 30;

/// Subscription lifecycle state machine and its read surface.
///
/// Privileged transitions (manual creation, approve, reject, cancel) are
/// gated through [`AuthorizationService`]; member-facing transitions (card
/// and transfer purchase, receipt upload) are gated by ownership.
#[derive(Clone)]
pub struct SubscriptionService {
    subscriptions: Arc<dyn SubscriptionRepository>,
    plans: Arc<dyn PlanRepository>,
    users: Arc<dyn UserRepository>,
    access_control: Arc<dyn AccessControlRepository>,
    authorization: AuthorizationService,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    /// Creates a subscription service from its collaborating ports.
    #[must_use]
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        plans: Arc<dyn PlanRepository>,
        users: Arc<dyn UserRepository>,
        access_control: Arc<dyn AccessControlRepository>,
        authorization: AuthorizationService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            users,
            access_control,
            authorization,
            clock,
        }
    }

    /// Returns the user's current subscription, if any: the most recently
    /// created pending or active row.
    ///
    /// Callers deciding "is this membership valid right now" must combine the
    /// stored status with the end date via
    /// [`Subscription::is_currently_valid`]; the stored status alone is not
    /// proactively flipped to expired.
    pub async fn current_subscription(&self, user_id: UserId) -> AppResult<Option<Subscription>> {
        self.subscriptions.current_for_user(user_id).await
    }

    /// Returns whether the user holds a currently valid membership.
    ///
    /// Resolved against the user's active rows directly, so a newer pending
    /// renewal never masks a paid membership that is still in-window.
    pub async fn membership_is_valid(&self, user_id: UserId) -> AppResult<bool> {
        let now = self.clock.now();
        let active = self
            .subscriptions
            .list(SubscriptionFilter {
                status: Some(SubscriptionStatus::Active),
                plan_id: None,
                user_ids: Some(vec![user_id]),
            })
            .await?;

        Ok(active
            .iter()
            .any(|subscription| subscription.is_currently_valid(now)))
    }

    /// Lists subscriptions for reviewers, with optional status, plan, and
    /// user-search filters.
    pub async fn list(
        &self,
        caller: &CallerIdentity,
        status: Option<SubscriptionStatus>,
        plan_id: Option<PlanId>,
        user_search: Option<&str>,
    ) -> AppResult<Vec<Subscription>> {
        self.authorization
            .require_permission(caller, permission_names::SUBSCRIPTIONS_REVIEW)
            .await?;

        let user_ids = match user_search {
            Some(query) => {
                let matches = self.users.search_users(query).await?;
                if matches.is_empty() {
                    return Ok(Vec::new());
                }
                Some(matches.into_iter().map(|user| user.id).collect())
            }
            None => None,
        };

        self.subscriptions
            .list(SubscriptionFilter {
                status,
                plan_id,
                user_ids,
            })
            .await
    }

    async fn load_purchasable_plan(&self, plan_id: PlanId) -> AppResult<SubscriptionPlan> {
        let plan = self
            .plans
            .find_plan(plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("plan '{plan_id}'")))?;

        if !plan.is_active {
            return Err(AppError::Validation(format!(
                "plan '{}' is not available for purchase",
                plan.name
            )));
        }

        Ok(plan)
    }

    async fn load_subscription(
        &self,
        subscription_id: SubscriptionId,
    ) -> AppResult<Subscription> {
        self.subscriptions
            .find(subscription_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subscription '{subscription_id}'")))
    }

    /// Computes the membership window granted by a plan starting now.
    fn plan_window(
        &self,
        plan: &SubscriptionPlan,
        starts_at: DateTime<Utc>,
    ) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        let ends_at = starts_at
            .checked_add_months(Months::new(plan.duration_months_or_default()))
            .ok_or_else(|| {
                AppError::Internal("membership end date overflows the calendar".to_owned())
            })?;

        Ok((starts_at, ends_at))
    }
}
