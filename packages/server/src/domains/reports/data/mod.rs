//! GraphQL data types for the reports domain

use chrono::{DateTime, Utc};
use juniper::GraphQLObject;
use uuid::Uuid;

use crate::domains::reports::models::{Report, ReportReason, ReportStatus, TargetType};

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(description = "A report filed against content or a user profile")]
pub struct ReportData {
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

impl From<Report> for ReportData {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            reporter_id: report.reporter_id,
            target_type: report.target_type,
            target_id: report.target_id,
            reason: report.reason,
            description: report.description,
            priority: report.priority,
            status: report.status,
            moderator_flagged: report.moderator_flagged,
            resolved_at: report.resolved_at,
            resolved_by: report.resolved_by,
            created_at: report.created_at,
        }
    }
}
