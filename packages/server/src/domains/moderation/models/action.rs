use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::domains::reports::models::TargetType;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    juniper::GraphQLEnum,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "action_type", rename_all = "snake_case")]
pub enum ActionType {
    ContentRemoved,
    ContentApproved,
    UserWarned,
    UserSuspended,
    UserBanned,
    RestrictionApplied,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ContentRemoved => "content_removed",
            ActionType::ContentApproved => "content_approved",
            ActionType::UserWarned => "user_warned",
            ActionType::UserSuspended => "user_suspended",
            ActionType::UserBanned => "user_banned",
            ActionType::RestrictionApplied => "restriction_applied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChangeKind {
    Applied,
    Reversed,
    Reapplied,
}

/// One entry in an action's append-only state history.
///
/// Entries are never edited; reversal appends, timestamps are non-decreasing
/// by construction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeEntry {
    pub timestamp: DateTime<Utc>,
    pub action: StateChangeKind,
    pub by_user_id: Uuid,
    pub reason: String,
    pub is_self_action: bool,
}

/// Cascade lineage of an action. Serialized untagged so the storage document
/// keeps the flat key set consumers expect (`cascading_action`,
/// `affected_tracks`, `parent_album_action`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CascadeLineage {
    /// Album-scoped parent record of a cascading removal.
    Parent {
        cascading_action: bool,
        affected_tracks: Vec<Uuid>,
        track_count: i64,
    },
    /// Track-scoped child record, pointing back at the album record.
    Child {
        parent_album_action: Uuid,
        parent_album_id: Uuid,
        cascaded_from_album: bool,
    },
    /// Ordinary single-target action.
    Standalone { cascading_action: bool },
}

impl CascadeLineage {
    pub fn parent(affected_tracks: Vec<Uuid>) -> Self {
        let track_count = affected_tracks.len() as i64;
        Self::Parent {
            cascading_action: true,
            affected_tracks,
            track_count,
        }
    }

    pub fn child(parent_album_action: Uuid, parent_album_id: Uuid) -> Self {
        Self::Child {
            parent_album_action,
            parent_album_id,
            cascaded_from_album: true,
        }
    }

    pub fn standalone() -> Self {
        Self::Standalone {
            cascading_action: false,
        }
    }
}

/// Reversal fields, set exactly once when an action is revoked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalMetadata {
    pub reversal_reason: String,
    pub is_self_reversal: bool,
}

/// Typed shape of the action metadata document.
///
/// Stored as one flat JSONB document; the tagged structure exists only on the
/// Rust side and flattens away at the storage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMetadata {
    #[serde(flatten)]
    pub lineage: CascadeLineage,
    #[serde(flatten)]
    pub reversal: Option<ReversalMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_changes: Vec<StateChangeEntry>,
}

impl Default for ActionMetadata {
    fn default() -> Self {
        Self {
            lineage: CascadeLineage::standalone(),
            reversal: None,
            state_changes: Vec::new(),
        }
    }
}

impl ActionMetadata {
    pub fn with_lineage(lineage: CascadeLineage) -> Self {
        Self {
            lineage,
            ..Default::default()
        }
    }
}

/// The permanent audit record of one moderation decision. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModerationAction {
    pub id: Uuid,
    pub moderator_id: Uuid,
    pub target_user_id: Uuid,
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: String,
    pub internal_notes: Option<String>,
    pub metadata: Json<ActionMetadata>,
    pub notification_sent: bool,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
}

impl ModerationAction {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Fields needed to persist a new action. The id is generated by the caller
/// so cascade children can reference their parent before any row exists.
#[derive(Debug, Clone)]
pub struct NewAction {
    pub id: Uuid,
    pub moderator_id: Uuid,
    pub target_user_id: Uuid,
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: String,
    pub internal_notes: Option<String>,
    pub metadata: ActionMetadata,
    pub notification_sent: bool,
}

/// Revocation fields applied in a single guarded update.
#[derive(Debug, Clone)]
pub struct RevocationUpdate {
    pub revoked_at: DateTime<Utc>,
    pub revoked_by: Uuid,
    pub metadata: ActionMetadata,
}

/// Filters for the reversal history query. All optional, combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ReversalFilters {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub moderator_id: Option<Uuid>,
    pub action_type: Option<ActionType>,
    pub reversal_reason: Option<String>,
    pub target_user_id: Option<Uuid>,
    pub revoked_by: Option<Uuid>,
}

impl ModerationAction {
    async fn insert_one<'e, E>(new: NewAction, executor: E) -> Result<Self>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Self>(
            "INSERT INTO moderation_actions
                (id, moderator_id, target_user_id, action_type, target_type,
                 target_id, reason, internal_notes, metadata, notification_sent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(new.id)
        .bind(new.moderator_id)
        .bind(new.target_user_id)
        .bind(new.action_type)
        .bind(new.target_type)
        .bind(new.target_id)
        .bind(new.reason)
        .bind(new.internal_notes)
        .bind(Json(new.metadata))
        .bind(new.notification_sent)
        .fetch_one(executor)
        .await
        .map_err(Into::into)
    }

    /// Insert a batch of action records in one transaction, so a cascade is
    /// either fully recorded or not recorded at all.
    pub async fn insert_all(actions: Vec<NewAction>, pool: &PgPool) -> Result<Vec<Self>> {
        let mut tx = pool.begin().await?;
        let mut inserted = Vec::with_capacity(actions.len());
        for action in actions {
            inserted.push(Self::insert_one(action, &mut *tx).await?);
        }
        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM moderation_actions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Atomically set the revocation fields. The `revoked_at IS NULL` guard
    /// makes this a compare-and-set: when two reversals race, the loser
    /// matches zero rows and gets None instead of overwriting history.
    pub async fn mark_revoked(
        id: Uuid,
        update: RevocationUpdate,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE moderation_actions
             SET revoked_at = $2, revoked_by = $3, metadata = $4
             WHERE id = $1 AND revoked_at IS NULL
             RETURNING *",
        )
        .bind(id)
        .bind(update.revoked_at)
        .bind(update.revoked_by)
        .bind(Json(update.metadata))
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Attempt to overwrite already-set revocation fields. The same
    /// `revoked_at IS NULL` guard applies, so for a revoked action this
    /// matches zero rows and reports the mutation as prevented.
    pub async fn overwrite_revocation(
        id: Uuid,
        update: RevocationUpdate,
        pool: &PgPool,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE moderation_actions
             SET revoked_at = $2, revoked_by = $3, metadata = $4
             WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .bind(update.revoked_at)
        .bind(update.revoked_by)
        .bind(Json(update.metadata))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_notification_sent(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE moderation_actions SET notification_sent = true WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn query_targeting(
        target_user_id: Uuid,
        include_revoked: bool,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let sql = if include_revoked {
            "SELECT * FROM moderation_actions WHERE target_user_id = $1
             ORDER BY created_at DESC"
        } else {
            "SELECT * FROM moderation_actions
             WHERE target_user_id = $1 AND revoked_at IS NULL
             ORDER BY created_at DESC"
        };
        sqlx::query_as::<_, Self>(sql)
            .bind(target_user_id)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn query_targeting_since(
        target_user_id: Uuid,
        since: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM moderation_actions
             WHERE target_user_id = $1 AND created_at >= $2
             ORDER BY created_at DESC",
        )
        .bind(target_user_id)
        .bind(since)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Revoked actions matching the given filters, most recent reversal first.
    pub async fn query_revoked(filters: ReversalFilters, pool: &PgPool) -> Result<Vec<Self>> {
        let mut qb =
            sqlx::QueryBuilder::new("SELECT * FROM moderation_actions WHERE revoked_at IS NOT NULL");
        if let Some(start) = filters.start_date {
            qb.push(" AND revoked_at >= ").push_bind(start);
        }
        if let Some(end) = filters.end_date {
            qb.push(" AND revoked_at <= ").push_bind(end);
        }
        if let Some(moderator_id) = filters.moderator_id {
            qb.push(" AND moderator_id = ").push_bind(moderator_id);
        }
        if let Some(action_type) = filters.action_type {
            qb.push(" AND action_type = ").push_bind(action_type);
        }
        if let Some(reason) = filters.reversal_reason {
            qb.push(" AND metadata->>'reversal_reason' = ").push_bind(reason);
        }
        if let Some(target_user_id) = filters.target_user_id {
            qb.push(" AND target_user_id = ").push_bind(target_user_id);
        }
        if let Some(revoked_by) = filters.revoked_by {
            qb.push(" AND revoked_by = ").push_bind(revoked_by);
        }
        qb.push(" ORDER BY revoked_at DESC");
        qb.build_query_as::<Self>()
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn query_in_range(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let mut qb = sqlx::QueryBuilder::new("SELECT * FROM moderation_actions WHERE true");
        if let Some(start) = start {
            qb.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = end {
            qb.push(" AND created_at <= ").push_bind(end);
        }
        qb.push(" ORDER BY created_at DESC");
        qb.build_query_as::<Self>()
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}
