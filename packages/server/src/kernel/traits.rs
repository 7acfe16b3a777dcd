// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic. The moderation
// pipeline talks to its external collaborators (relational store, role store,
// security event log, notification dispatcher) exclusively through these
// interfaces, which is what keeps the core testable without live services.
//
// Naming convention: Base* for trait names (e.g., BaseModerationStore)

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Role;
use crate::domains::moderation::models::{
    ModerationAction, NewAction, NewRestriction, Restriction, ReversalFilters, RevocationUpdate,
};
use crate::domains::reports::models::{NewReport, Report, ReportReason, TargetType};

// =============================================================================
// Security events
// =============================================================================

/// Well-known security event types written by the moderation pipeline.
pub mod event_types {
    pub const ADMIN_REPORT_ATTEMPT: &str = "admin_report_attempt";
    pub const UNAUTHORIZED_MODERATION_ATTEMPT: &str = "unauthorized_moderation_attempt";
    pub const UNAUTHORIZED_ADMIN_ACTION_ATTEMPT: &str = "unauthorized_admin_action_attempt";
    pub const UNAUTHORIZED_ACTION_ON_ADMIN_TARGET: &str = "unauthorized_action_on_admin_target";
    pub const UNAUTHORIZED_BAN_REVOKE_ATTEMPT: &str = "unauthorized_ban_revoke_attempt";
    pub const REVERSAL_MODIFICATION_ATTEMPT: &str = "reversal_modification_attempt";
    pub const REVERSAL_MODIFICATION_SUCCEEDED: &str = "reversal_modification_succeeded";
    pub const REVERSAL_IMMUTABILITY_VIOLATION: &str = "reversal_immutability_violation";
}

/// One entry in the append-only security event log.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SecurityEvent {
    pub event_type: String,
    pub user_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SecurityEvent {
    pub fn now(event_type: &str, user_id: Option<Uuid>, details: serde_json::Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            user_id,
            details,
            created_at: Utc::now(),
        }
    }
}

// =============================================================================
// Catalog boundary types
// =============================================================================

/// An album together with its owner and child track ids, as needed by the
/// cascading action executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumContext {
    pub album_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub track_ids: Vec<Uuid>,
}

// =============================================================================
// Relational store (reports, actions, restrictions, content catalog)
// =============================================================================

#[async_trait]
pub trait BaseModerationStore: Send + Sync {
    // --- reports ---
    async fn insert_report(&self, report: NewReport) -> Result<Report>;
    async fn find_report(&self, id: Uuid) -> Result<Option<Report>>;
    async fn count_reports_since(&self, reporter_id: Uuid, since: DateTime<Utc>) -> Result<i64>;
    async fn duplicate_report_exists(
        &self,
        reporter_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        reason: ReportReason,
        since: DateTime<Utc>,
    ) -> Result<bool>;
    /// Transition a report to resolved; None when missing or already resolved.
    async fn resolve_report(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<Report>>;
    /// Open reports in queue order: priority, moderator flag, recency.
    async fn open_reports(&self) -> Result<Vec<Report>>;

    // --- actions ---
    /// Insert a batch of action records atomically (a cascade is all-or-nothing).
    async fn insert_actions(&self, actions: Vec<NewAction>) -> Result<Vec<ModerationAction>>;
    async fn find_action(&self, id: Uuid) -> Result<Option<ModerationAction>>;
    /// Compare-and-set revocation: None when the action was already revoked.
    async fn mark_revoked(
        &self,
        id: Uuid,
        update: RevocationUpdate,
    ) -> Result<Option<ModerationAction>>;
    /// Attempt to overwrite revocation fields; returns whether anything changed.
    /// For an already-revoked action this must always return false.
    async fn overwrite_revocation(&self, id: Uuid, update: RevocationUpdate) -> Result<bool>;
    async fn set_notification_sent(&self, id: Uuid) -> Result<()>;
    async fn actions_targeting(
        &self,
        target_user_id: Uuid,
        include_revoked: bool,
    ) -> Result<Vec<ModerationAction>>;
    async fn actions_targeting_since(
        &self,
        target_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ModerationAction>>;
    async fn actions_in_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<ModerationAction>>;
    async fn revoked_actions(&self, filters: ReversalFilters) -> Result<Vec<ModerationAction>>;

    // --- restrictions ---
    async fn insert_restriction(&self, restriction: NewRestriction) -> Result<Restriction>;
    async fn find_restriction_by_action(&self, action_id: Uuid) -> Result<Option<Restriction>>;
    async fn deactivate_restriction(&self, id: Uuid) -> Result<()>;

    // --- content catalog ---
    async fn target_exists(&self, target_type: TargetType, target_id: Uuid) -> Result<bool>;
    async fn find_album(&self, album_id: Uuid) -> Result<Option<AlbumContext>>;
    /// Remove a single piece of content (post, comment, track).
    async fn remove_content(&self, target_type: TargetType, target_id: Uuid) -> Result<()>;
    /// Remove an album. With `remove_tracks` the child tracks go too;
    /// otherwise only the album row and its track links are deleted and the
    /// track rows are preserved (selective deletion).
    async fn remove_album(&self, album_id: Uuid, remove_tracks: bool) -> Result<()>;
}

// =============================================================================
// Role store
// =============================================================================

#[async_trait]
pub trait BaseRoleStore: Send + Sync {
    async fn has_role(&self, user_id: Uuid, role: Role) -> Result<bool>;
    /// All users holding a role (used for admin breach alerts).
    async fn users_with_role(&self, role: Role) -> Result<Vec<Uuid>>;
}

// =============================================================================
// Security event sink
// =============================================================================

#[async_trait]
pub trait BaseSecurityEventSink: Send + Sync {
    /// Append one event. The log is append-only; there is no update or delete.
    async fn record(&self, event: SecurityEvent) -> Result<()>;
    /// Events at or after `since`, optionally filtered to one user,
    /// oldest first.
    async fn events_since(
        &self,
        user_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Result<Vec<SecurityEvent>>;
}

// =============================================================================
// Notification dispatcher
// =============================================================================

#[async_trait]
pub trait BaseNotificationDispatcher: Send + Sync {
    /// Fire-and-forget delivery; callers log failures and never abort on them.
    async fn send(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        data: serde_json::Value,
    ) -> Result<()>;
}
