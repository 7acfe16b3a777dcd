use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// What kind of entity a report or moderation action targets.
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
#[sqlx(type_name = "target_type", rename_all = "snake_case")]
pub enum TargetType {
    Post,
    Comment,
    Track,
    User,
    Album,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::Comment => "comment",
            TargetType::Track => "track",
            TargetType::User => "user",
            TargetType::Album => "album",
        }
    }
}

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
#[sqlx(type_name = "report_reason", rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Harassment,
    HateSpeech,
    InappropriateContent,
    CopyrightViolation,
    Impersonation,
    SelfHarm,
    Other,
}

impl ReportReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::Spam => "spam",
            ReportReason::Harassment => "harassment",
            ReportReason::HateSpeech => "hate_speech",
            ReportReason::InappropriateContent => "inappropriate_content",
            ReportReason::CopyrightViolation => "copyright_violation",
            ReportReason::Impersonation => "impersonation",
            ReportReason::SelfHarm => "self_harm",
            ReportReason::Other => "other",
        }
    }
}

/// Report status state machine: pending/under_review -> resolved, never backward.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    juniper::GraphQLEnum,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    UnderReview,
    Resolved,
}

/// A user or moderator report against a piece of content or a user profile.
///
/// Once resolved, all fields are immutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub priority: i32,
    pub status: ReportStatus,
    pub moderator_flagged: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to persist a new report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub reporter_id: Uuid,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub priority: i32,
    pub status: ReportStatus,
    pub moderator_flagged: bool,
}

impl Report {
    pub async fn insert(new: NewReport, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO reports
                (reporter_id, target_type, target_id, reason, description,
                 priority, status, moderator_flagged)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(new.reporter_id)
        .bind(new.target_type)
        .bind(new.target_id)
        .bind(new.reason)
        .bind(new.description)
        .bind(new.priority)
        .bind(new.status)
        .bind(new.moderator_flagged)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// Number of reports a reporter has filed since `since`, across all types.
    pub async fn count_by_reporter_since(
        reporter_id: Uuid,
        since: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reports WHERE reporter_id = $1 AND created_at >= $2",
        )
        .bind(reporter_id)
        .bind(since)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    pub async fn duplicate_exists(
        reporter_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        reason: ReportReason,
        since: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM reports
             WHERE reporter_id = $1 AND target_type = $2 AND target_id = $3
               AND reason = $4 AND created_at >= $5",
        )
        .bind(reporter_id)
        .bind(target_type)
        .bind(target_id)
        .bind(reason)
        .bind(since)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    /// Transition a report to resolved. Guarded so a resolved report is never
    /// rewritten; returns None when the report is missing or already resolved.
    pub async fn resolve(
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "UPDATE reports
             SET status = 'resolved', resolved_by = $2, resolved_at = $3
             WHERE id = $1 AND status <> 'resolved'
             RETURNING *",
        )
        .bind(id)
        .bind(resolved_by)
        .bind(resolved_at)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// The moderation queue: open reports, highest priority first, moderator
    /// flags ahead of user reports at the same priority, then most recent.
    pub async fn query_open_queue(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM reports
             WHERE status <> 'resolved'
             ORDER BY priority ASC, moderator_flagged DESC, created_at DESC",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
