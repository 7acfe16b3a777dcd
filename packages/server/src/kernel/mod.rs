//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod notifications;
pub mod postgres;
pub mod test_dependencies;
pub mod traits;

pub use deps::ModerationDeps;
pub use notifications::{NoopNotifier, WebhookNotifier};
pub use postgres::{PostgresRoleStore, PostgresSecurityEventSink, PostgresStore};
pub use test_dependencies::TestDependencies;
pub use traits::*;
