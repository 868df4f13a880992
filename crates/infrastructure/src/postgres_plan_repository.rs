use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use gymgate_application::PlanRepository;
use gymgate_core::{AppError, AppResult};
use gymgate_domain::{PlanId, SubscriptionPlan};

/// PostgreSQL-backed plan catalog.
#[derive(Clone)]
pub struct PostgresPlanRepository {
    pool: PgPool,
}

impl PostgresPlanRepository {
    /// Creates a plan repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PlanRow {
    id: uuid::Uuid,
    name: String,
    price_cents: i64,
    duration_months: Option<i32>,
    features: Value,
    is_active: bool,
}

impl TryFrom<PlanRow> for SubscriptionPlan {
    type Error = AppError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let duration_months = match row.duration_months {
            Some(months) => Some(u32::try_from(months).map_err(|_| {
                AppError::Internal(format!(
                    "plan '{}' has a negative duration of {months} months",
                    row.id
                ))
            })?),
            None => None,
        };

        let features: Vec<String> = serde_json::from_value(row.features).map_err(|error| {
            AppError::Internal(format!("failed to decode plan features: {error}"))
        })?;

        Ok(SubscriptionPlan {
            id: PlanId::from_uuid(row.id),
            name: row.name,
            price_cents: row.price_cents,
            duration_months,
            features,
            is_active: row.is_active,
        })
    }
}

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn find_plan(&self, plan_id: PlanId) -> AppResult<Option<SubscriptionPlan>> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, name, price_cents, duration_months, features, is_active
            FROM subscription_plans
            WHERE id = $1
            "#,
        )
        .bind(plan_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load plan: {error}")))?;

        row.map(SubscriptionPlan::try_from).transpose()
    }

    async fn list_plans(&self, include_inactive: bool) -> AppResult<Vec<SubscriptionPlan>> {
        let rows = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, name, price_cents, duration_months, features, is_active
            FROM subscription_plans
            WHERE is_active OR $1
            ORDER BY price_cents
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list plans: {error}")))?;

        rows.into_iter().map(SubscriptionPlan::try_from).collect()
    }
}
