use chrono::{TimeDelta, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use gymgate_application::{
    NewNotification, NotificationRepository, SubscriptionApproval, SubscriptionRepository,
};
use gymgate_core::{AppError, UserId};
use gymgate_domain::{
    PaymentMethod, PlanId, Subscription, SubscriptionId, SubscriptionPlan, SubscriptionStatus,
};

use crate::postgres_notification_repository::PostgresNotificationRepository;

use super::PostgresSubscriptionRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres subscription tests: {error}");
    }

    Some(pool)
}

async fn seeded_plan(pool: &PgPool) -> SubscriptionPlan {
    let plan = SubscriptionPlan {
        id: PlanId::new(),
        name: "Pro".to_owned(),
        price_cents: 2499,
        duration_months: Some(1),
        features: vec!["unlimited classes".to_owned()],
        is_active: true,
    };

    let features = match serde_json::to_value(&plan.features) {
        Ok(features) => features,
        Err(error) => panic!("failed to encode plan features: {error}"),
    };

    let insert = sqlx::query(
        r#"
        INSERT INTO subscription_plans (id, name, price_cents, duration_months, features, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(plan.id.as_uuid())
    .bind(plan.name.as_str())
    .bind(plan.price_cents)
    .bind(plan.duration_months.map(i64::from))
    .bind(features)
    .bind(plan.is_active)
    .execute(pool)
    .await;
    assert!(insert.is_ok());

    plan
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

#[tokio::test]
async fn concurrent_approvals_succeed_exactly_once() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSubscriptionRepository::new(pool.clone());
    let notifications = PostgresNotificationRepository::new(pool.clone());
    let member = UserId::new();
    let plan = seeded_plan(&pool).await;
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
        repository.approve_pending(subscription_id, approval(UserId::new()), fanout()),
        repository.approve_pending(subscription_id, approval(UserId::new()), fanout()),
    );

    let successes = [&first, &second]
        .iter()
        .filter(|result| result.is_ok())
        .count();
    assert_eq!(successes, 1);

    let loser = if first.is_ok() { second } else { first };
    assert!(matches!(loser, Err(AppError::InvalidState { .. })));

    // Only the winning transaction committed its fan-out.
    let delivered = notifications.unread_count(member).await;
    assert!(matches!(delivered, Ok(1)));
}

#[tokio::test]
async fn the_unique_index_refuses_a_second_active_subscription() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSubscriptionRepository::new(pool.clone());
    let member = UserId::new();
    let plan = seeded_plan(&pool).await;

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
    assert!(canceled.is_ok());

    let retry = repository
        .insert_exclusive_active(duplicate, Vec::new())
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn receipt_attachment_commits_fanout_with_the_transition() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresSubscriptionRepository::new(pool.clone());
    let notifications = PostgresNotificationRepository::new(pool.clone());
    let member = UserId::new();
    let trainer = UserId::new();
    let plan = seeded_plan(&pool).await;
    let subscription = pending_transfer(member, plan.id);
    let subscription_id = subscription.id;

    let inserted = repository.insert(subscription.clone(), Vec::new()).await;
    assert!(inserted.is_ok());

    let fanout = vec![NewNotification::subscription_request(
        trainer,
        "Mara",
        &subscription,
        &plan,
        Utc::now(),
    )];

    let updated = repository
        .attach_receipt_pending(subscription_id, "receipts/1.jpg", fanout)
        .await;
    assert!(matches!(
        &updated,
        Ok(subscription) if subscription.receipt_path.as_deref() == Some("receipts/1.jpg")
            && subscription.status == SubscriptionStatus::Pending
    ));

    let inbox = notifications.list_for_user(trainer).await;
    let Ok(inbox) = inbox else {
        panic!("inbox listing must succeed");
    };
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].payload.subscription_id, subscription_id);
}
