//! GraphQL data types for the moderation domain

use chrono::{DateTime, Utc};
use juniper::GraphQLObject;
use uuid::Uuid;

use crate::domains::moderation::actions::ActionOutcome;
use crate::domains::moderation::models::{ActionType, ModerationAction};
use crate::domains::reports::data::ReportData;
use crate::domains::reports::models::TargetType;
use crate::kernel::traits::AlbumContext;

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(description = "The permanent audit record of one moderation decision")]
pub struct ModerationActionData {
    pub id: Uuid,
    pub moderator_id: Uuid,
    pub target_user_id: Uuid,
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: String,
    pub internal_notes: Option<String>,
    /// The full metadata document (lineage, reversal fields, state history),
    /// serialized as JSON.
    pub metadata: String,
    pub notification_sent: bool,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
}

impl From<ModerationAction> for ModerationActionData {
    fn from(action: ModerationAction) -> Self {
        Self {
            id: action.id,
            moderator_id: action.moderator_id,
            target_user_id: action.target_user_id,
            action_type: action.action_type,
            target_type: action.target_type,
            target_id: action.target_id,
            reason: action.reason,
            internal_notes: action.internal_notes,
            metadata: serde_json::to_string(&action.metadata.0).unwrap_or_default(),
            notification_sent: action.notification_sent,
            created_at: action.created_at,
            revoked_at: action.revoked_at,
            revoked_by: action.revoked_by,
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(description = "Everything one takeModerationAction call produced")]
pub struct ActionOutcomeData {
    pub action: ModerationActionData,
    pub cascaded_actions: Vec<ModerationActionData>,
    pub resolved_report: Option<ReportData>,
}

impl From<ActionOutcome> for ActionOutcomeData {
    fn from(outcome: ActionOutcome) -> Self {
        Self {
            action: outcome.action.into(),
            cascaded_actions: outcome
                .cascaded_actions
                .into_iter()
                .map(Into::into)
                .collect(),
            resolved_report: outcome.resolved_report.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(description = "An album with its owner and child track ids")]
pub struct AlbumContextData {
    pub album_id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub track_ids: Vec<Uuid>,
}

impl From<AlbumContext> for AlbumContextData {
    fn from(album: AlbumContext) -> Self {
        Self {
            album_id: album.album_id,
            owner_id: album.owner_id,
            title: album.title,
            track_ids: album.track_ids,
        }
    }
}
