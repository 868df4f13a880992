use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Months of membership granted when a plan does not specify a duration.
pub const DEFAULT_DURATION_MONTHS: u32 = 1;

/// Unique identifier for a subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanId(Uuid);

impl PlanId {
    /// Creates a new random plan identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a plan identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PlanId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A purchasable membership plan.
///
/// Plans are immutable during an active subscription's lifetime from the
/// subscription's point of view: price and duration are snapshotted onto the
/// subscription at creation and never re-read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    /// Stable plan identifier.
    pub id: PlanId,
    /// Plan name shown to members.
    pub name: String,
    /// Price in cents, snapshotted onto subscriptions at creation.
    pub price_cents: i64,
    /// Membership duration in months; `None` falls back to
    /// [`DEFAULT_DURATION_MONTHS`].
    pub duration_months: Option<u32>,
    /// Marketing feature list rendered by clients.
    pub features: Vec<String>,
    /// Inactive plans are hidden from purchase listings.
    pub is_active: bool,
}

impl SubscriptionPlan {
    /// Returns the plan duration, falling back to the default of one month.
    #[must_use]
    pub fn duration_months_or_default(&self) -> u32 {
        self.duration_months.unwrap_or(DEFAULT_DURATION_MONTHS)
    }
}
