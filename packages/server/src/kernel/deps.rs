//! Server dependencies for domain actions (using traits for testability)
//!
//! This module provides the central dependency container used by all domain
//! actions. All external collaborators use trait abstractions so tests run
//! against the in-memory implementations in `test_dependencies`.

use std::sync::Arc;

use sqlx::PgPool;

use crate::kernel::notifications::NoopNotifier;
use crate::kernel::postgres::{PostgresRoleStore, PostgresSecurityEventSink, PostgresStore};
use crate::kernel::traits::{
    BaseModerationStore, BaseNotificationDispatcher, BaseRoleStore, BaseSecurityEventSink,
};

/// Dependencies accessible to every moderation action.
#[derive(Clone)]
pub struct ModerationDeps {
    pub store: Arc<dyn BaseModerationStore>,
    pub roles: Arc<dyn BaseRoleStore>,
    pub security_events: Arc<dyn BaseSecurityEventSink>,
    pub notifications: Arc<dyn BaseNotificationDispatcher>,
}

impl ModerationDeps {
    /// Production wiring: everything backed by Postgres, notifications by the
    /// provided dispatcher.
    pub fn postgres(pool: PgPool, notifications: Arc<dyn BaseNotificationDispatcher>) -> Self {
        Self {
            store: Arc::new(PostgresStore::new(pool.clone())),
            roles: Arc::new(PostgresRoleStore::new(pool.clone())),
            security_events: Arc::new(PostgresSecurityEventSink::new(pool)),
            notifications,
        }
    }

    /// Postgres wiring with notifications logged and dropped.
    pub fn postgres_silent(pool: PgPool) -> Self {
        Self::postgres(pool, Arc::new(NoopNotifier))
    }
}
