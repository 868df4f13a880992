use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use gymgate_application::{
    NewNotification, SubscriptionApproval, SubscriptionFilter, SubscriptionRepository,
};
use gymgate_core::{AppError, AppResult, UserId};
use gymgate_domain::{
    PaymentMethod, PlanId, Subscription, SubscriptionId, SubscriptionStatus,
};

use crate::postgres_notification_repository::insert_notification_rows;

mod transitions;

#[cfg(test)]
mod tests;

/// Name of the partial unique index enforcing one active subscription per
/// user.
const ONE_ACTIVE_INDEX: &str = "subscriptions_one_active_per_user";

/// PostgreSQL-backed subscription store.
///
/// Lifecycle transitions insert their notification fan-out inside the same
/// transaction as the row update; approval and rejection are conditional
/// updates on the pending status so concurrent reviewers cannot both win.
#[derive(Clone)]
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    /// Creates a subscription repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    plan_id: uuid::Uuid,
    price_cents: i64,
    payment_method: String,
    status: String,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    approved_at: Option<DateTime<Utc>>,
    approved_by: Option<uuid::Uuid>,
    receipt_path: Option<String>,
    card_summary: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = AppError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            price_cents: row.price_cents,
            payment_method: PaymentMethod::from_str(row.payment_method.as_str())?,
            status: SubscriptionStatus::from_str(row.status.as_str())?,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            approved_at: row.approved_at,
            approved_by: row.approved_by.map(UserId::from_uuid),
            receipt_path: row.receipt_path,
            card_summary: row.card_summary,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    id, user_id, plan_id, price_cents, payment_method, status,
    starts_at, ends_at, approved_at, approved_by,
    receipt_path, card_summary, rejection_reason, created_at
"#;

fn is_one_active_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db_error| db_error.constraint() == Some(ONE_ACTIVE_INDEX))
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        self.insert_impl(subscription, fanout).await
    }

    async fn insert_exclusive_active(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        // The partial unique index refuses the second active row; no separate
        // lookup is needed for race safety.
        self.insert_impl(subscription, fanout).await
    }

    async fn find(&self, subscription_id: SubscriptionId) -> AppResult<Option<Subscription>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM subscriptions WHERE id = $1"
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(query.as_str())
            .bind(subscription_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to load subscription: {error}"))
            })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn current_for_user(&self, user_id: UserId) -> AppResult<Option<Subscription>> {
        let query = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM subscriptions
            WHERE user_id = $1 AND status IN ('pending', 'active')
            ORDER BY created_at DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(query.as_str())
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to load current subscription: {error}"))
            })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn list(&self, filter: SubscriptionFilter) -> AppResult<Vec<Subscription>> {
        let user_ids: Option<Vec<uuid::Uuid>> = filter
            .user_ids
            .map(|ids| ids.iter().map(UserId::as_uuid).collect());

        let query = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM subscriptions
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR plan_id = $2)
              AND ($3::uuid[] IS NULL OR user_id = ANY($3))
            ORDER BY created_at DESC
            "#
        );
        let rows = sqlx::query_as::<_, SubscriptionRow>(query.as_str())
            .bind(filter.status.map(|status| status.as_str()))
            .bind(filter.plan_id.map(|plan_id| plan_id.as_uuid()))
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to list subscriptions: {error}"))
            })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn attach_receipt_pending(
        &self,
        subscription_id: SubscriptionId,
        receipt_path: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        self.attach_receipt_pending_impl(subscription_id, receipt_path, fanout)
            .await
    }

    async fn approve_pending(
        &self,
        subscription_id: SubscriptionId,
        approval: SubscriptionApproval,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        self.approve_pending_impl(subscription_id, approval, fanout)
            .await
    }

    async fn reject_pending(
        &self,
        subscription_id: SubscriptionId,
        reason: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        self.reject_pending_impl(subscription_id, reason, fanout)
            .await
    }

    async fn cancel_active_for_user(
        &self,
        user_id: UserId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        self.cancel_active_for_user_impl(user_id, ends_at).await
    }
}

impl PostgresSubscriptionRepository {
    async fn insert_impl(
        &self,
        subscription: Subscription,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan_id, price_cents, payment_method, status,
                starts_at, ends_at, approved_at, approved_by,
                receipt_path, card_summary, rejection_reason, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(subscription.plan_id.as_uuid())
        .bind(subscription.price_cents)
        .bind(subscription.payment_method.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.starts_at)
        .bind(subscription.ends_at)
        .bind(subscription.approved_at)
        .bind(subscription.approved_by.map(|user_id| user_id.as_uuid()))
        .bind(subscription.receipt_path.as_deref())
        .bind(subscription.card_summary.as_deref())
        .bind(subscription.rejection_reason.as_deref())
        .bind(subscription.created_at)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            if is_one_active_violation(&error) {
                return AppError::DuplicateActiveSubscription(format!(
                    "user '{}' already holds an active subscription",
                    subscription.user_id
                ));
            }
            AppError::Internal(format!("failed to persist subscription: {error}"))
        })?;

        insert_notification_rows(&mut transaction, &fanout).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })?;

        Ok(subscription)
    }
}
