//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_control_repository;
mod in_memory_notification_repository;
mod in_memory_plan_repository;
mod in_memory_subscription_repository;
mod in_memory_user_repository;
mod postgres_access_control_repository;
mod postgres_notification_repository;
mod postgres_plan_repository;
mod postgres_subscription_repository;
mod postgres_user_repository;

pub use in_memory_access_control_repository::InMemoryAccessControlRepository;
pub use in_memory_notification_repository::InMemoryNotificationRepository;
pub use in_memory_plan_repository::InMemoryPlanRepository;
pub use in_memory_subscription_repository::InMemorySubscriptionRepository;
pub use in_memory_user_repository::InMemoryUserRepository;
pub use postgres_access_control_repository::PostgresAccessControlRepository;
pub use postgres_notification_repository::PostgresNotificationRepository;
pub use postgres_plan_repository::PostgresPlanRepository;
pub use postgres_subscription_repository::PostgresSubscriptionRepository;
pub use postgres_user_repository::PostgresUserRepository;
