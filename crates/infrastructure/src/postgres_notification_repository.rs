use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use gymgate_application::{NewNotification, NotificationRepository};
use gymgate_core::{AppError, AppResult, UserId};
use gymgate_domain::{Notification, NotificationId, NotificationKind};

/// PostgreSQL-backed notification store.
#[derive(Clone)]
pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    /// Creates a notification repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct NotificationRow {
    id: uuid::Uuid,
    recipient: uuid::Uuid,
    kind: String,
    title: String,
    message: String,
    payload: Value,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let payload = serde_json::from_value(row.payload).map_err(|error| {
            AppError::Internal(format!("failed to decode notification payload: {error}"))
        })?;

        Ok(Notification {
            id: NotificationId::from_uuid(row.id),
            recipient: UserId::from_uuid(row.recipient),
            kind: NotificationKind::from_str(row.kind.as_str())?,
            title: row.title,
            message: row.message,
            payload,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

/// Inserts notification rows inside an open transaction.
///
/// Shared with the subscription repository so lifecycle fan-out commits or
/// rolls back with its triggering transition.
pub(crate) async fn insert_notification_rows(
    transaction: &mut Transaction<'_, Postgres>,
    rows: &[NewNotification],
) -> AppResult<()> {
    for row in rows {
        let payload = serde_json::to_value(&row.payload).map_err(|error| {
            AppError::Internal(format!("failed to encode notification payload: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient, kind, title, message, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.id.as_uuid())
        .bind(row.recipient.as_uuid())
        .bind(row.kind.as_str())
        .bind(row.title.as_str())
        .bind(row.message.as_str())
        .bind(payload)
        .bind(row.created_at)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to persist notification: {error}"))
        })?;
    }

    Ok(())
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn insert_many(&self, notifications: Vec<NewNotification>) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        insert_notification_rows(&mut transaction, &notifications).await?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn list_for_user(&self, user_id: UserId) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient, kind, title, message, payload, read_at, created_at
            FROM notifications
            WHERE recipient = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list notifications: {error}")))?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn unread_count(&self, user_id: UserId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM notifications
            WHERE recipient = $1 AND read_at IS NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to count unread notifications: {error}"))
        })?;

        u64::try_from(count)
            .map_err(|_| AppError::Internal("negative unread notification count".to_owned()))
    }

    async fn mark_read(
        &self,
        user_id: UserId,
        notification_id: NotificationId,
        read_at: DateTime<Utc>,
    ) -> AppResult<Notification> {
        // COALESCE keeps the original timestamp on repeated calls.
        let row = sqlx::query_as::<_, NotificationRow>(
            r#"
            UPDATE notifications
            SET read_at = COALESCE(read_at, $3)
            WHERE id = $1 AND recipient = $2
            RETURNING id, recipient, kind, title, message, payload, read_at, created_at
            "#,
        )
        .bind(notification_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(read_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to mark notification read: {error}"))
        })?
        .ok_or_else(|| AppError::NotFound(format!("notification '{notification_id}'")))?;

        Notification::try_from(row)
    }

    async fn mark_all_read(&self, user_id: UserId, read_at: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read_at = $2
            WHERE recipient = $1 AND read_at IS NULL
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(read_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to mark notifications read: {error}"))
        })?;

        Ok(result.rows_affected())
    }
}
