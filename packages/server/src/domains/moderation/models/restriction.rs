use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A time-bounded capability removal, distinct from suspension/ban.
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
#[sqlx(type_name = "restriction_kind", rename_all = "snake_case")]
pub enum RestrictionKind {
    Posting,
    Commenting,
    Upload,
}

/// Restriction linked to a suspension/ban/restriction action.
/// The active flag is toggled false when the action is reversed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Restriction {
    pub id: Uuid,
    pub action_id: Uuid,
    pub user_id: Uuid,
    pub kind: RestrictionKind,
    pub active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRestriction {
    pub action_id: Uuid,
    pub user_id: Uuid,
    pub kind: RestrictionKind,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Restriction {
    pub async fn insert(new: NewRestriction, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO restrictions (action_id, user_id, kind, active, expires_at)
             VALUES ($1, $2, $3, true, $4)
             RETURNING *",
        )
        .bind(new.action_id)
        .bind(new.user_id)
        .bind(new.kind)
        .bind(new.expires_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find_by_action(action_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM restrictions WHERE action_id = $1")
            .bind(action_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn deactivate(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE restrictions SET active = false WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
