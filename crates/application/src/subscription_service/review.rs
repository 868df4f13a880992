use super::*;

impl SubscriptionService {
    /// Approves a pending subscription.
    ///
    /// Requires the `subscriptions.review` permission. The membership window
    /// is computed from the plan at approval time, not at creation. The
    /// status check and update are a single conditional update in the
    /// repository, so two concurrent approvals yield exactly one success.
    pub async fn approve(
        &self,
        caller: &CallerIdentity,
        subscription_id: SubscriptionId,
    ) -> AppResult<Subscription> {
        self.authorization
            .require_permission(caller, permission_names::SUBSCRIPTIONS_REVIEW)
            .await?;

        let subscription = self.load_subscription(subscription_id).await?;
        let plan = self
            .plans
            .find_plan(subscription.plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("plan '{}'", subscription.plan_id)))?;

        let now = self.clock.now();
        let (starts_at, ends_at) = self.plan_window(&plan, now)?;

        let approval = SubscriptionApproval {
            approved_by: caller.user_id(),
            approved_at: now,
            starts_at,
            ends_at,
        };

        // Compose the purchaser notification against the post-approval shape
        // so the payload reports the resulting status.
        let mut approved_shape = subscription;
        approved_shape.status = SubscriptionStatus::Active;
        let fanout = vec![NewNotification::subscription_approved(
            &approved_shape,
            &plan,
            now,
        )];

        let approved = self
            .subscriptions
            .approve_pending(subscription_id, approval, fanout)
            .await?;

        info!(
            subscription = %approved.id,
            approver = %caller.user_id(),
            "subscription approved"
        );
        Ok(approved)
    }

    /// Rejects a pending subscription with a free-text reason.
    ///
    /// Requires the `subscriptions.review` permission. A default reason is
    /// stored when the caller omits one. Same conditional-update contract as
    /// [`SubscriptionService::approve`].
    pub async fn reject(
        &self,
        caller: &CallerIdentity,
        subscription_id: SubscriptionId,
        reason: Option<String>,
    ) -> AppResult<Subscription> {
        self.authorization
            .require_permission(caller, permission_names::SUBSCRIPTIONS_REVIEW)
            .await?;

        let subscription = self.load_subscription(subscription_id).await?;
        let plan = self
            .plans
            .find_plan(subscription.plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("plan '{}'", subscription.plan_id)))?;

        let reason = reason
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_owned());

        let now = self.clock.now();
        let mut rejected_shape = subscription;
        rejected_shape.status = SubscriptionStatus::Rejected;
        let fanout = vec![NewNotification::subscription_rejected(
            &rejected_shape,
            &plan,
            reason.as_str(),
            now,
        )];

        let rejected = self
            .subscriptions
            .reject_pending(subscription_id, reason.as_str(), fanout)
            .await?;

        info!(
            subscription = %rejected.id,
            reviewer = %caller.user_id(),
            "subscription rejected"
        );
        Ok(rejected)
    }

    /// Cancels the target user's active subscription, ending it immediately.
    ///
    /// Requires the `subscriptions.manage` permission.
    pub async fn cancel(
        &self,
        caller: &CallerIdentity,
        target_user_id: UserId,
    ) -> AppResult<Subscription> {
        self.authorization
            .require_permission(caller, permission_names::SUBSCRIPTIONS_MANAGE)
            .await?;

        let now = self.clock.now();
        let canceled = self
            .subscriptions
            .cancel_active_for_user(target_user_id, now)
            .await?;

        info!(
            subscription = %canceled.id,
            member = %target_user_id,
            "subscription canceled"
        );
        Ok(canceled)
    }
}
