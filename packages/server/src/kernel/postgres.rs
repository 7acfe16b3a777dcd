//! Postgres-backed implementations of the collaborator traits.
//!
//! Entity queries live on the domain models; these adapters only route the
//! trait surface onto them plus the catalog/role/event tables.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::Role;
use crate::domains::moderation::models::{
    ModerationAction, NewAction, NewRestriction, Restriction, ReversalFilters, RevocationUpdate,
};
use crate::domains::reports::models::{NewReport, Report, ReportReason, TargetType};
use crate::kernel::traits::{
    AlbumContext, BaseModerationStore, BaseRoleStore, BaseSecurityEventSink, SecurityEvent,
};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseModerationStore for PostgresStore {
    async fn insert_report(&self, report: NewReport) -> Result<Report> {
        Report::insert(report, &self.pool).await
    }

    async fn find_report(&self, id: Uuid) -> Result<Option<Report>> {
        Report::find_by_id(id, &self.pool).await
    }

    async fn count_reports_since(&self, reporter_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        Report::count_by_reporter_since(reporter_id, since, &self.pool).await
    }

    async fn duplicate_report_exists(
        &self,
        reporter_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        reason: ReportReason,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        Report::duplicate_exists(reporter_id, target_type, target_id, reason, since, &self.pool)
            .await
    }

    async fn resolve_report(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<Report>> {
        Report::resolve(id, resolved_by, resolved_at, &self.pool).await
    }

    async fn open_reports(&self) -> Result<Vec<Report>> {
        Report::query_open_queue(&self.pool).await
    }

    async fn insert_actions(&self, actions: Vec<NewAction>) -> Result<Vec<ModerationAction>> {
        ModerationAction::insert_all(actions, &self.pool).await
    }

    async fn find_action(&self, id: Uuid) -> Result<Option<ModerationAction>> {
        ModerationAction::find_by_id(id, &self.pool).await
    }

    async fn mark_revoked(
        &self,
        id: Uuid,
        update: RevocationUpdate,
    ) -> Result<Option<ModerationAction>> {
        ModerationAction::mark_revoked(id, update, &self.pool).await
    }

    async fn overwrite_revocation(&self, id: Uuid, update: RevocationUpdate) -> Result<bool> {
        ModerationAction::overwrite_revocation(id, update, &self.pool).await
    }

    async fn set_notification_sent(&self, id: Uuid) -> Result<()> {
        ModerationAction::set_notification_sent(id, &self.pool).await
    }

    async fn actions_targeting(
        &self,
        target_user_id: Uuid,
        include_revoked: bool,
    ) -> Result<Vec<ModerationAction>> {
        ModerationAction::query_targeting(target_user_id, include_revoked, &self.pool).await
    }

    async fn actions_targeting_since(
        &self,
        target_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ModerationAction>> {
        ModerationAction::query_targeting_since(target_user_id, since, &self.pool).await
    }

    async fn actions_in_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<ModerationAction>> {
        ModerationAction::query_in_range(start, end, &self.pool).await
    }

    async fn revoked_actions(&self, filters: ReversalFilters) -> Result<Vec<ModerationAction>> {
        ModerationAction::query_revoked(filters, &self.pool).await
    }

    async fn insert_restriction(&self, restriction: NewRestriction) -> Result<Restriction> {
        Restriction::insert(restriction, &self.pool).await
    }

    async fn find_restriction_by_action(&self, action_id: Uuid) -> Result<Option<Restriction>> {
        Restriction::find_by_action(action_id, &self.pool).await
    }

    async fn deactivate_restriction(&self, id: Uuid) -> Result<()> {
        Restriction::deactivate(id, &self.pool).await
    }

    async fn target_exists(&self, target_type: TargetType, target_id: Uuid) -> Result<bool> {
        let table = match target_type {
            TargetType::Post => "posts",
            TargetType::Comment => "comments",
            TargetType::Track => "tracks",
            TargetType::User => "users",
            TargetType::Album => "albums",
        };
        let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = $1");
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn find_album(&self, album_id: Uuid) -> Result<Option<AlbumContext>> {
        let album: Option<(Uuid, Uuid, String)> =
            sqlx::query_as("SELECT id, owner_id, title FROM albums WHERE id = $1")
                .bind(album_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some((id, owner_id, title)) = album else {
            return Ok(None);
        };
        let track_ids: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT track_id FROM album_tracks WHERE album_id = $1 ORDER BY position",
        )
        .bind(album_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(Some(AlbumContext {
            album_id: id,
            owner_id,
            title,
            track_ids: track_ids.into_iter().map(|(t,)| t).collect(),
        }))
    }

    async fn remove_content(&self, target_type: TargetType, target_id: Uuid) -> Result<()> {
        match target_type {
            TargetType::Post => {
                sqlx::query("DELETE FROM posts WHERE id = $1")
                    .bind(target_id)
                    .execute(&self.pool)
                    .await?;
            }
            TargetType::Comment => {
                sqlx::query("DELETE FROM comments WHERE id = $1")
                    .bind(target_id)
                    .execute(&self.pool)
                    .await?;
            }
            TargetType::Track => {
                sqlx::query("DELETE FROM tracks WHERE id = $1")
                    .bind(target_id)
                    .execute(&self.pool)
                    .await?;
            }
            TargetType::Album => {
                self.remove_album(target_id, false).await?;
            }
            TargetType::User => {
                anyhow::bail!("user profiles are never deleted by moderation");
            }
        }
        Ok(())
    }

    async fn remove_album(&self, album_id: Uuid, remove_tracks: bool) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let track_ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT track_id FROM album_tracks WHERE album_id = $1")
                .bind(album_id)
                .fetch_all(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM album_tracks WHERE album_id = $1")
            .bind(album_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(album_id)
            .execute(&mut *tx)
            .await?;
        if remove_tracks {
            for (track_id,) in track_ids {
                sqlx::query("DELETE FROM tracks WHERE id = $1")
                    .bind(track_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

pub struct PostgresRoleStore {
    pool: PgPool,
}

impl PostgresRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseRoleStore for PostgresRoleStore {
    async fn has_role(&self, user_id: Uuid, role: Role) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM user_roles WHERE user_id = $1 AND role = $2")
                .bind(user_id)
                .bind(role)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT user_id FROM user_roles WHERE role = $1")
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

pub struct PostgresSecurityEventSink {
    pool: PgPool,
}

impl PostgresSecurityEventSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseSecurityEventSink for PostgresSecurityEventSink {
    async fn record(&self, event: SecurityEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO security_events (event_type, user_id, details, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(event.event_type)
        .bind(event.user_id)
        .bind(event.details)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn events_since(
        &self,
        user_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Result<Vec<SecurityEvent>> {
        let events = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, SecurityEvent>(
                    "SELECT event_type, user_id, details, created_at FROM security_events
                     WHERE user_id = $1 AND created_at >= $2
                     ORDER BY created_at ASC",
                )
                .bind(user_id)
                .bind(since)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SecurityEvent>(
                    "SELECT event_type, user_id, details, created_at FROM security_events
                     WHERE created_at >= $1
                     ORDER BY created_at ASC",
                )
                .bind(since)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(events)
    }
}
