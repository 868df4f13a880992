use super::*;

use sqlx::{Postgres, Transaction};

impl PostgresSubscriptionRepository {
    pub(super) async fn attach_receipt_pending_impl(
        &self,
        subscription_id: SubscriptionId,
        receipt_path: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut transaction = begin(&self.pool).await?;

        let query = format!(
            r#"
            UPDATE subscriptions
            SET receipt_path = $2, status = 'pending'
            WHERE id = $1
            RETURNING {SELECT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(query.as_str())
            .bind(subscription_id.as_uuid())
            .bind(receipt_path)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to attach receipt: {error}"))
            })?
            .ok_or_else(|| AppError::NotFound(format!("subscription '{subscription_id}'")))?;

        insert_notification_rows(&mut transaction, &fanout).await?;
        commit(transaction).await?;

        Subscription::try_from(row)
    }

    pub(super) async fn approve_pending_impl(
        &self,
        subscription_id: SubscriptionId,
        approval: SubscriptionApproval,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut transaction = begin(&self.pool).await?;

        let query = format!(
            r#"
            UPDATE subscriptions
            SET status = 'active',
                approved_at = $2,
                approved_by = $3,
                starts_at = $4,
                ends_at = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING {SELECT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(query.as_str())
            .bind(subscription_id.as_uuid())
            .bind(approval.approved_at)
            .bind(approval.approved_by.as_uuid())
            .bind(approval.starts_at)
            .bind(approval.ends_at)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| {
                if is_one_active_violation(&error) {
                    return AppError::DuplicateActiveSubscription(
                        "member already holds another active subscription".to_owned(),
                    );
                }
                AppError::Internal(format!("failed to approve subscription: {error}"))
            })?;

        let Some(row) = row else {
            return Err(self
                .not_pending_error(subscription_id, "only pending subscriptions can be approved")
                .await);
        };

        insert_notification_rows(&mut transaction, &fanout).await?;
        commit(transaction).await?;

        Subscription::try_from(row)
    }

    pub(super) async fn reject_pending_impl(
        &self,
        subscription_id: SubscriptionId,
        reason: &str,
        fanout: Vec<NewNotification>,
    ) -> AppResult<Subscription> {
        let mut transaction = begin(&self.pool).await?;

        let query = format!(
            r#"
            UPDATE subscriptions
            SET status = 'rejected', rejection_reason = $2
            WHERE id = $1 AND status = 'pending'
            RETURNING {SELECT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(query.as_str())
            .bind(subscription_id.as_uuid())
            .bind(reason)
            .fetch_optional(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to reject subscription: {error}"))
            })?;

        let Some(row) = row else {
            return Err(self
                .not_pending_error(subscription_id, "only pending subscriptions can be rejected")
                .await);
        };

        insert_notification_rows(&mut transaction, &fanout).await?;
        commit(transaction).await?;

        Subscription::try_from(row)
    }

    pub(super) async fn cancel_active_for_user_impl(
        &self,
        user_id: UserId,
        ends_at: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        let query = format!(
            r#"
            UPDATE subscriptions
            SET status = 'canceled', ends_at = $2
            WHERE user_id = $1 AND status = 'active'
            RETURNING {SELECT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SubscriptionRow>(query.as_str())
            .bind(user_id.as_uuid())
            .bind(ends_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to cancel subscription: {error}"))
            })?
            .ok_or_else(|| {
                AppError::NotFound(format!("no active subscription for user '{user_id}'"))
            })?;

        Subscription::try_from(row)
    }

    /// Resolves why a conditional update matched no row: missing entirely, or
    /// present in a non-pending status.
    async fn not_pending_error(&self, subscription_id: SubscriptionId, reason: &str) -> AppError {
        let status = sqlx::query_scalar::<_, String>(
            r#"
            SELECT status
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(subscription_id.as_uuid())
        .fetch_optional(&self.pool)
        .await;

        match status {
            Ok(Some(current)) => AppError::InvalidState {
                reason: reason.to_owned(),
                current,
            },
            Ok(None) => AppError::NotFound(format!("subscription '{subscription_id}'")),
            Err(error) => {
                AppError::Internal(format!("failed to load subscription status: {error}"))
            }
        }
    }
}

async fn begin(pool: &PgPool) -> AppResult<Transaction<'_, Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}
