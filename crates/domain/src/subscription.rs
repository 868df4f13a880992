use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use gymgate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::PlanId;

/// Unique identifier for a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Creates a new random subscription identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a subscription identifier from an existing UUID value.
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

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Payment method chosen at subscription creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card-shaped self-service purchase; activates immediately.
    Card,
    /// Bank transfer; starts pending and requires reviewer approval.
    Transfer,
    /// Reviewer-initiated subscription created on a member's behalf.
    Manual,
}

impl PaymentMethod {
    /// Returns a stable storage value for this payment method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Transfer => "transfer",
            Self::Manual => "manual",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "card" => Ok(Self::Card),
            "transfer" => Ok(Self::Transfer),
            "manual" => Ok(Self::Manual),
            _ => Err(AppError::Validation(format!(
                "unknown payment method '{value}'"
            ))),
        }
    }
}

/// Lifecycle status of a subscription.
///
/// `Rejected`, `Canceled`, and `Expired` are terminal; no transition leaves
/// them. Expiry is additionally computed lazily from `ends_at` rather than
/// flipped by a background sweep, see [`Subscription::effective_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Awaiting reviewer approval (transfer payments only).
    Pending,
    /// Paid and approved membership.
    Active,
    /// Declined by a reviewer.
    Rejected,
    /// Canceled by an administrative action.
    Canceled,
    /// Lapsed past its end date.
    Expired,
}

impl SubscriptionStatus {
    /// Returns a stable storage value for this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }

    /// Returns whether the status admits no further transitions.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Canceled | Self::Expired)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "rejected" => Ok(Self::Rejected),
            "canceled" => Ok(Self::Canceled),
            "expired" => Ok(Self::Expired),
            _ => Err(AppError::Validation(format!(
                "unknown subscription status '{value}'"
            ))),
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

/// Card input captured for a self-service purchase.
///
/// No payment network is called; fields are presence-validated and only a
/// redacted summary is retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    /// Card number as entered.
    pub number: String,
    /// Name on the card.
    pub holder_name: String,
    /// Expiry as entered, e.g. `12/27`.
    pub expiry: String,
    /// Card verification value.
    pub cvv: String,
}

impl CardDetails {
    /// Validates that every card field is present.
    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("number", self.number.as_str()),
            ("name", self.holder_name.as_str()),
            ("expiry", self.expiry.as_str()),
            ("cvv", self.cvv.as_str()),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("card {field} is required")));
            }
        }

        if self.digits().len() < 4 {
            return Err(AppError::Validation(
                "card number must contain at least four digits".to_owned(),
            ));
        }

        Ok(())
    }

    /// Returns the redacted summary stored in place of the card number.
    #[must_use]
    pub fn redacted_summary(&self) -> String {
        let digits = self.digits();
        let last_four: String = digits
            .chars()
            .skip(digits.len().saturating_sub(4))
            .collect();
        format!("card ending ****{last_four}")
    }

    fn digits(&self) -> String {
        self.number.chars().filter(char::is_ascii_digit).collect()
    }
}

/// A membership purchase and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Stable subscription identifier.
    pub id: SubscriptionId,
    /// Purchasing member.
    pub user_id: UserId,
    /// Referenced plan.
    pub plan_id: PlanId,
    /// Price in cents captured at creation; never re-read from the plan.
    pub price_cents: i64,
    /// Payment method chosen at creation.
    pub payment_method: PaymentMethod,
    /// Current lifecycle status.
    pub status: SubscriptionStatus,
    /// Membership start, set on activation.
    pub starts_at: Option<DateTime<Utc>>,
    /// Membership end, set on activation or cancellation.
    pub ends_at: Option<DateTime<Utc>>,
    /// Approval timestamp, set when the subscription became active.
    pub approved_at: Option<DateTime<Utc>>,
    /// Account that approved the subscription.
    pub approved_by: Option<UserId>,
    /// Uploaded payment receipt reference (transfer payments only).
    pub receipt_path: Option<String>,
    /// Redacted card summary (card payments only).
    pub card_summary: Option<String>,
    /// Reviewer-supplied reason (rejected subscriptions only).
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Returns whether the membership is currently valid.
    ///
    /// Validity requires both an `Active` status and a future end date;
    /// callers must not conflate this with the stored status alone.
    #[must_use]
    pub fn is_currently_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.ends_at.is_some_and(|ends_at| ends_at > now)
    }

    /// Returns the status for display and metrics purposes.
    ///
    /// An `Active` subscription whose end date has passed is reported as
    /// `Expired` even though no background process rewrites the stored value.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> SubscriptionStatus {
        if self.status == SubscriptionStatus::Active
            && self.ends_at.is_some_and(|ends_at| ends_at <= now)
        {
            return SubscriptionStatus::Expired;
        }

        self.status
    }
}
