use async_trait::async_trait;
use tokio::sync::RwLock;

use gymgate_application::PlanRepository;
use gymgate_core::AppResult;
use gymgate_domain::{PlanId, SubscriptionPlan};

/// In-memory plan catalog, for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryPlanRepository {
    plans: RwLock<Vec<SubscriptionPlan>>,
}

impl InMemoryPlanRepository {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a plan, replacing any existing plan with the same identifier.
    pub async fn upsert(&self, plan: SubscriptionPlan) {
        let mut plans = self.plans.write().await;
        plans.retain(|existing| existing.id != plan.id);
        plans.push(plan);
    }
}

#[async_trait]
impl PlanRepository for InMemoryPlanRepository {
    async fn find_plan(&self, plan_id: PlanId) -> AppResult<Option<SubscriptionPlan>> {
        Ok(self
            .plans
            .read()
            .await
            .iter()
            .find(|plan| plan.id == plan_id)
            .cloned())
    }

    async fn list_plans(&self, include_inactive: bool) -> AppResult<Vec<SubscriptionPlan>> {
        Ok(self
            .plans
            .read()
            .await
            .iter()
            .filter(|plan| include_inactive || plan.is_active)
            .cloned()
            .collect())
    }
}
