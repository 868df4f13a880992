use super::*;

use gymgate_domain::{CardDetails, PaymentMethod, SYSTEM_ROLE_TRAINER};

impl SubscriptionService {
    /// Creates a card-paid subscription: validates the card shape, keeps a
    /// redacted summary, and activates immediately for the plan's duration.
    ///
    /// No payment network is called. The purchaser receives an approval
    /// notification persisted atomically with the insert. A member who
    /// already holds an active subscription is refused.
    pub async fn create_card(
        &self,
        caller: &CallerIdentity,
        plan_id: PlanId,
        card: CardDetails,
    ) -> AppResult<Subscription> {
        card.validate()?;

        let plan = self.load_purchasable_plan(plan_id).await?;
        let now = self.clock.now();
        let (starts_at, ends_at) = self.plan_window(&plan, now)?;

        let subscription = Subscription {
            id: SubscriptionId::new(),
            user_id: caller.user_id(),
            plan_id: plan.id,
            price_cents: plan.price_cents,
            payment_method: PaymentMethod::Card,
            status: SubscriptionStatus::Active,
            starts_at: Some(starts_at),
            ends_at: Some(ends_at),
            approved_at: Some(now),
            approved_by: Some(caller.user_id()),
            receipt_path: None,
            card_summary: Some(card.redacted_summary()),
            rejection_reason: None,
            created_at: now,
        };

        let fanout = vec![NewNotification::subscription_approved(
            &subscription,
            &plan,
            now,
        )];

        let created = self
            .subscriptions
            .insert_exclusive_active(subscription, fanout)
            .await?;
        info!(subscription = %created.id, plan = plan.name, "card subscription activated");
        Ok(created)
    }

    /// Creates a transfer-paid subscription in pending status.
    ///
    /// No timestamps are set and no notification is emitted yet; reviewers
    /// are notified when the receipt is uploaded, since that is the
    /// actionable moment.
    pub async fn create_transfer(
        &self,
        caller: &CallerIdentity,
        plan_id: PlanId,
    ) -> AppResult<Subscription> {
        let plan = self.load_purchasable_plan(plan_id).await?;
        let now = self.clock.now();

        let subscription = Subscription {
            id: SubscriptionId::new(),
            user_id: caller.user_id(),
            plan_id: plan.id,
            price_cents: plan.price_cents,
            payment_method: PaymentMethod::Transfer,
            status: SubscriptionStatus::Pending,
            starts_at: None,
            ends_at: None,
            approved_at: None,
            approved_by: None,
            receipt_path: None,
            card_summary: None,
            rejection_reason: None,
            created_at: now,
        };

        let created = self.subscriptions.insert(subscription, Vec::new()).await?;
        info!(subscription = %created.id, plan = plan.name, "transfer subscription pending");
        Ok(created)
    }

    /// Creates an active subscription on a member's behalf.
    ///
    /// Requires the `subscriptions.manage` permission. The target must not
    /// already hold an active subscription; the check is race-safe in the
    /// repository. The membership runs for a fixed thirty days regardless of
    /// plan duration.
    pub async fn create_manual(
        &self,
        caller: &CallerIdentity,
        target_user_id: UserId,
        plan_id: PlanId,
    ) -> AppResult<Subscription> {
        self.authorization
            .require_permission(caller, permission_names::SUBSCRIPTIONS_MANAGE)
            .await?;

        self.users
            .find_user(target_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user '{target_user_id}'")))?;

        let plan = self.load_purchasable_plan(plan_id).await?;
        let now = self.clock.now();

        let subscription = Subscription {
            id: SubscriptionId::new(),
            user_id: target_user_id,
            plan_id: plan.id,
            price_cents: plan.price_cents,
            payment_method: PaymentMethod::Manual,
            status: SubscriptionStatus::Active,
            starts_at: Some(now),
            ends_at: Some(now + TimeDelta::days(MANUAL_DURATION_DAYS)),
            approved_at: Some(now),
            approved_by: Some(caller.user_id()),
            receipt_path: None,
            card_summary: None,
            rejection_reason: None,
            created_at: now,
        };

        let created = self
            .subscriptions
            .insert_exclusive_active(subscription, Vec::new())
            .await?;

        info!(
            subscription = %created.id,
            member = %target_user_id,
            approver = %caller.user_id(),
            "manual subscription activated"
        );
        Ok(created)
    }

    /// Attaches a transfer receipt to the caller's own subscription and fans
    /// out one request notification per account currently holding the
    /// trainer role.
    ///
    /// The audience is resolved at fan-out time, never from a cached list,
    /// and the rows are persisted atomically with the receipt update. The
    /// status is re-asserted to pending even if it already was.
    pub async fn upload_receipt(
        &self,
        caller: &CallerIdentity,
        subscription_id: SubscriptionId,
        receipt_path: &str,
    ) -> AppResult<Subscription> {
        if receipt_path.trim().is_empty() {
            return Err(AppError::Validation("receipt reference is required".to_owned()));
        }

        let subscription = self.load_subscription(subscription_id).await?;

        if subscription.user_id != caller.user_id() {
            return Err(AppError::Forbidden(
                "receipts can only be uploaded for your own subscription".to_owned(),
            ));
        }

        if subscription.payment_method != PaymentMethod::Transfer {
            return Err(AppError::InvalidState {
                reason: "only transfer subscriptions accept receipts".to_owned(),
                current: subscription.status.as_str().to_owned(),
            });
        }

        let plan = self
            .plans
            .find_plan(subscription.plan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("plan '{}'", subscription.plan_id)))?;

        let reviewers = self
            .access_control
            .list_users_with_role(SYSTEM_ROLE_TRAINER)
            .await?;

        let now = self.clock.now();
        let fanout = reviewers
            .into_iter()
            .map(|reviewer| {
                NewNotification::subscription_request(
                    reviewer,
                    caller.display_name(),
                    &subscription,
                    &plan,
                    now,
                )
            })
            .collect();

        let updated = self
            .subscriptions
            .attach_receipt_pending(subscription_id, receipt_path, fanout)
            .await?;

        info!(subscription = %updated.id, "transfer receipt uploaded");
        Ok(updated)
    }
}
