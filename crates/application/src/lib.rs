//! Application services and ports for the gym membership core.

#![forbid(unsafe_code)]

mod access_control_ports;
mod access_control_service;
mod authorization_service;
mod catalog_bootstrap;
mod clock;
mod notification_ports;
mod notification_service;
mod subscription_ports;
mod subscription_service;

pub use access_control_ports::{
    AccessControlRepository, NewPermission, NewRole, PermissionSync, RoleDelta, RoleUpdate,
};
pub use access_control_service::{
    AccessControlService, PermissionMatrix, PermissionMatrixEntry,
};
pub use authorization_service::AuthorizationService;
pub use catalog_bootstrap::ensure_system_catalog;
pub use clock::{Clock, FixedClock, SystemClock};
pub use notification_ports::{NewNotification, NotificationRepository};
pub use notification_service::NotificationService;
pub use subscription_ports::{
    PlanRepository, SubscriptionApproval, SubscriptionFilter, SubscriptionRepository,
    UserRepository,
};
pub use subscription_service::{SubscriptionService, DEFAULT_REJECTION_REASON};
