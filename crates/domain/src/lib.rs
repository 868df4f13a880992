//! Domain entities and invariants for the gym membership core.

#![forbid(unsafe_code)]

mod access;
mod notification;
mod plan;
mod subscription;
mod user;

pub use access::{
    DEFAULT_GUARD, Permission, PermissionId, Role, RoleId, SYSTEM_ROLE_ADMIN, SYSTEM_ROLE_MEMBER,
    SYSTEM_ROLE_NAMES, SYSTEM_ROLE_TRAINER, permission_names,
};
pub use notification::{Notification, NotificationId, NotificationKind, NotificationPayload};
pub use plan::{DEFAULT_DURATION_MONTHS, PlanId, SubscriptionPlan};
pub use subscription::{
    CardDetails, PaymentMethod, Subscription, SubscriptionId, SubscriptionStatus,
};
pub use user::{EmailAddress, User};
