use std::sync::Arc;

use chrono::{TimeDelta, Utc};

use gymgate_application::{
    AccessControlRepository, AuthorizationService, FixedClock, NewNotification,
    NotificationRepository, NotificationService, SubscriptionApproval, SubscriptionFilter,
    SubscriptionRepository, SubscriptionService, ensure_system_catalog,
};
use gymgate_core::{AppError, CallerIdentity, UserId};
use gymgate_domain::{
    EmailAddress, NotificationKind, PaymentMethod, PlanId, SYSTEM_ROLE_TRAINER, Subscription,
    SubscriptionId, SubscriptionPlan, SubscriptionStatus, User,
};

use crate::in_memory_access_control_repository::InMemoryAccessControlRepository;
use crate::in_memory_notification_repository::InMemoryNotificationRepository;
use crate::in_memory_plan_repository::InMemoryPlanRepository;
use crate::in_memory_user_repository::InMemoryUserRepository;

use super::InMemorySubscriptionRepository;

fn plan() -> SubscriptionPlan {
    SubscriptionPlan {
        id: PlanId::new(),
        name: "Pro".to_owned(),
        price_cents: 2499,
        duration_months: Some(1),
        features: vec!["unlimited classes".to_owned()],
        is_active: true,
    }
}

fn pending_transfer(user_id: UserId, plan_id: PlanId) -> Subscription {
    Subscription {
        id: SubscriptionId::new(),
        user_id,
        plan_id,
        price_cents: 2499,
        payment_method: PaymentMethod::Transfer,
        status: SubscriptionStatus::Pending,
        starts_at: None,
        ends_at: None,
        approved_at: None,
        approved_by: None,
        receipt_path: None,
        card_summary: None,
        rejection_reason: None,
        created_at: Utc::now(),
    }
}

fn approval(approved_by: UserId) -> SubscriptionApproval {
    let now = Utc::now();
    SubscriptionApproval {
        approved_by,
        approved_at: now,
        starts_at: now,
        ends_at: now + TimeDelta::days(30),
    }
}

fn store() -> (InMemorySubscriptionRepository, Arc<InMemoryNotificationRepository>) {
    let notifications = Arc::new(InMemoryNotificationRepository::new());
    (
        InMemorySubscriptionRepository::new(notifications.clone()),
        notifications,
    )
}

#[tokio::test]
async fn concurrent_approvals_succeed_exactly_once() {
    let (repository, notifications) = store();
    let member = UserId::new();
    let reviewer = UserId::new();
    let plan = plan();
    let subscription = pending_transfer(member, plan.id);
    let subscription_id = subscription.id;

    let inserted = repository.insert(subscription.clone(), Vec::new()).await;
    assert!(inserted.is_ok());

    let fanout = || {
        vec![NewNotification::subscription_approved(
            &subscription,
            &plan,
            Utc::now(),
        )]
    };

    let (first, second) = tokio::join!(
        repository.approve_pending(subscription_id, approval(reviewer), fanout()),
        repository.approve_pending(subscription_id, approval(reviewer), fanout()),
    );

    let successes = [&first, &second]
        .iter()
        .filter(|result| result.is_ok())
        .count();
    assert_eq!(successes, 1);

    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(
        loser,
        Err(AppError::InvalidState { current, .. }) if current == "active"
    ));

    // The losing call must not have persisted its fan-out.
    let delivered = notifications.unread_count(member).await;
    assert!(matches!(delivered, Ok(1)));
}

#[tokio::test]
async fn terminal_statuses_refuse_review_transitions() {
    let (repository, _notifications) = store();
    let member = UserId::new();
    let plan = plan();
    let subscription = pending_transfer(member, plan.id);
    let subscription_id = subscription.id;

    let inserted = repository.insert(subscription, Vec::new()).await;
    assert!(inserted.is_ok());

    let rejected = repository
        .reject_pending(subscription_id, "no receipt", Vec::new())
        .await;
    assert!(matches!(
        &rejected,
        Ok(subscription) if subscription.status == SubscriptionStatus::Rejected
            && subscription.rejection_reason.as_deref() == Some("no receipt")
    ));

    let approve_after = repository
        .approve_pending(subscription_id, approval(UserId::new()), Vec::new())
        .await;
    assert!(matches!(
        approve_after,
        Err(AppError::InvalidState { current, .. }) if current == "rejected"
    ));

    let reject_again = repository
        .reject_pending(subscription_id, "again", Vec::new())
        .await;
    assert!(matches!(reject_again, Err(AppError::InvalidState { .. })));
}

#[tokio::test]
async fn exclusive_insert_is_refused_until_cancellation() {
    let (repository, _notifications) = store();
    let member = UserId::new();
    let plan = plan();

    let mut active = pending_transfer(member, plan.id);
    active.status = SubscriptionStatus::Active;
    active.ends_at = Some(Utc::now() + TimeDelta::days(30));

    let inserted = repository
        .insert_exclusive_active(active.clone(), Vec::new())
        .await;
    assert!(inserted.is_ok());

    let mut duplicate = active.clone();
    duplicate.id = SubscriptionId::new();
    let refused = repository
        .insert_exclusive_active(duplicate.clone(), Vec::new())
        .await;
    assert!(matches!(
        refused,
        Err(AppError::DuplicateActiveSubscription(_))
    ));

    let canceled = repository.cancel_active_for_user(member, Utc::now()).await;
    assert!(matches!(
        &canceled,
        Ok(subscription) if subscription.status == SubscriptionStatus::Canceled
    ));

    let retry = repository
        .insert_exclusive_active(duplicate, Vec::new())
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn plain_insert_refuses_a_second_active_row() {
    let (repository, _notifications) = store();
    let member = UserId::new();
    let plan = plan();

    let mut active = pending_transfer(member, plan.id);
    active.status = SubscriptionStatus::Active;
    active.ends_at = Some(Utc::now() + TimeDelta::days(30));

    let inserted = repository.insert(active.clone(), Vec::new()).await;
    assert!(inserted.is_ok());

    // The one-active invariant holds regardless of the insert path, as it
    // does under the Postgres partial unique index.
    let mut duplicate = active.clone();
    duplicate.id = SubscriptionId::new();
    let refused = repository.insert(duplicate, Vec::new()).await;
    assert!(matches!(
        refused,
        Err(AppError::DuplicateActiveSubscription(_))
    ));

    // Non-active rows for the same member are unaffected.
    let renewal = pending_transfer(member, plan.id);
    let pending = repository.insert(renewal, Vec::new()).await;
    assert!(pending.is_ok());
}

#[tokio::test]
async fn receipt_fanout_lands_in_the_shared_notification_store() {
    let (repository, notifications) = store();
    let member = UserId::new();
    let trainers = [UserId::new(), UserId::new()];
    let plan = plan();
    let subscription = pending_transfer(member, plan.id);
    let subscription_id = subscription.id;

    let inserted = repository.insert(subscription.clone(), Vec::new()).await;
    assert!(inserted.is_ok());

    let fanout = trainers
        .iter()
        .map(|trainer| {
            NewNotification::subscription_request(*trainer, "Mara", &subscription, &plan, Utc::now())
        })
        .collect();

    let updated = repository
        .attach_receipt_pending(subscription_id, "receipts/1.jpg", fanout)
        .await;
    assert!(matches!(
        &updated,
        Ok(subscription) if subscription.receipt_path.as_deref() == Some("receipts/1.jpg")
    ));

    for trainer in trainers {
        let inbox = notifications.list_for_user(trainer).await;
        let Ok(inbox) = inbox else {
            panic!("inbox listing must succeed");
        };
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::SubscriptionRequest);
        assert_eq!(inbox[0].payload.price_cents, 2499);
    }
}

#[tokio::test]
async fn current_for_user_prefers_the_latest_open_row() {
    let (repository, _notifications) = store();
    let member = UserId::new();
    let plan = plan();

    let mut rejected = pending_transfer(member, plan.id);
    rejected.status = SubscriptionStatus::Rejected;
    rejected.created_at = Utc::now() + TimeDelta::days(1);

    let mut older = pending_transfer(member, plan.id);
    older.created_at = Utc::now() - TimeDelta::days(2);

    let newer = pending_transfer(member, plan.id);
    let newer_id = newer.id;

    for subscription in [rejected, older, newer] {
        let inserted = repository.insert(subscription, Vec::new()).await;
        assert!(inserted.is_ok());
    }

    let current = repository.current_for_user(member).await;
    assert!(matches!(
        current,
        Ok(Some(subscription)) if subscription.id == newer_id
    ));

    let none = repository.current_for_user(UserId::new()).await;
    assert!(matches!(none, Ok(None)));
}

#[tokio::test]
async fn list_orders_newest_first_and_applies_filters() {
    let (repository, _notifications) = store();
    let member = UserId::new();
    let plan = plan();

    let mut older = pending_transfer(member, plan.id);
    older.created_at = Utc::now() - TimeDelta::days(1);
    let older_id = older.id;
    let newer = pending_transfer(member, plan.id);
    let newer_id = newer.id;

    for subscription in [older, newer] {
        let inserted = repository.insert(subscription, Vec::new()).await;
        assert!(inserted.is_ok());
    }

    let listed = repository.list(SubscriptionFilter::default()).await;
    let Ok(listed) = listed else {
        panic!("listing must succeed");
    };
    let ids: Vec<SubscriptionId> = listed.iter().map(|row| row.id).collect();
    assert_eq!(ids, [newer_id, older_id]);

    let filtered = repository
        .list(SubscriptionFilter {
            status: Some(SubscriptionStatus::Active),
            ..SubscriptionFilter::default()
        })
        .await;
    assert!(matches!(filtered, Ok(rows) if rows.is_empty()));
}

// Full transfer lifecycle wired through the real services and in-memory
// adapters: purchase, receipt upload, reviewer approval, and the member's
// notification inbox.
#[tokio::test]
async fn transfer_lifecycle_end_to_end() {
    let access_control = Arc::new(InMemoryAccessControlRepository::new());
    let seeded = ensure_system_catalog(access_control.as_ref()).await;
    assert!(seeded.is_ok());

    let notifications = Arc::new(InMemoryNotificationRepository::new());
    let subscriptions = Arc::new(InMemorySubscriptionRepository::new(notifications.clone()));
    let plans = Arc::new(InMemoryPlanRepository::new());
    let users = Arc::new(InMemoryUserRepository::new());

    let plan = plan();
    plans.upsert(plan.clone()).await;

    let member = account(users.as_ref(), "Mara Member", "mara@gym.example").await;
    let trainer = account(users.as_ref(), "Tariq Trainer", "tariq@gym.example").await;
    bind_role(access_control.as_ref(), trainer.user_id(), SYSTEM_ROLE_TRAINER).await;

    let now = Utc::now();
    let authorization = AuthorizationService::new(access_control.clone());
    let service = SubscriptionService::new(
        subscriptions.clone(),
        plans,
        users,
        access_control.clone(),
        authorization,
        Arc::new(FixedClock::new(now)),
    );
    let inbox = NotificationService::new(notifications.clone(), Arc::new(FixedClock::new(now)));

    let created = service.create_transfer(&member, plan.id).await;
    let Ok(subscription) = created else {
        panic!("transfer creation must succeed");
    };

    let valid_before = service.membership_is_valid(member.user_id()).await;
    assert!(matches!(valid_before, Ok(false)));

    let uploaded = service
        .upload_receipt(&member, subscription.id, "receipts/1.jpg")
        .await;
    assert!(uploaded.is_ok());

    let trainer_unread = inbox.unread_count(&trainer).await;
    assert!(matches!(trainer_unread, Ok(1)));

    let approved = service.approve(&trainer, subscription.id).await;
    assert!(matches!(
        &approved,
        Ok(subscription) if subscription.status == SubscriptionStatus::Active
            && subscription.approved_by == Some(trainer.user_id())
    ));

    let valid_after = service.membership_is_valid(member.user_id()).await;
    assert!(matches!(valid_after, Ok(true)));

    let member_inbox = inbox.list_for_user(&member).await;
    let Ok(member_inbox) = member_inbox else {
        panic!("inbox listing must succeed");
    };
    assert_eq!(member_inbox.len(), 1);
    assert_eq!(member_inbox[0].kind, NotificationKind::SubscriptionApproved);

    let marked = inbox.mark_all_read(&member).await;
    assert!(matches!(marked, Ok(1)));
    let unread_after = inbox.unread_count(&member).await;
    assert!(matches!(unread_after, Ok(0)));

    // A second approval attempt observes the already-active status.
    let replay = service.approve(&trainer, subscription.id).await;
    assert!(matches!(replay, Err(AppError::InvalidState { .. })));

    // The member cannot read the trainer's copy of the request notice.
    let trainer_inbox = inbox.list_for_user(&trainer).await;
    let Ok(trainer_inbox) = trainer_inbox else {
        panic!("inbox listing must succeed");
    };
    let foreign = inbox.mark_read(&member, trainer_inbox[0].id).await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));
}

async fn account(users: &InMemoryUserRepository, name: &str, email: &str) -> CallerIdentity {
    let Ok(email) = EmailAddress::new(email) else {
        panic!("test email must be valid");
    };
    let user = User {
        id: UserId::new(),
        email,
        display_name: name.to_owned(),
        password_hash: "hash".to_owned(),
        photo_path: None,
    };
    users.upsert(user.clone()).await;
    CallerIdentity::new(user.id, name, None)
}

async fn bind_role(
    access_control: &InMemoryAccessControlRepository,
    user_id: UserId,
    role_name: &str,
) {
    let role = access_control.find_role_by_name(role_name).await;
    let Ok(Some(role)) = role else {
        panic!("system role '{role_name}' must be seeded");
    };
    let bound = access_control.assign_role_to_user(user_id, role.id).await;
    assert!(bound.is_ok());
}
