//! Submit report action - validated report intake with rate limiting

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError, Role};
use crate::domains::moderation::guards::Guard;
use crate::domains::reports::models::{NewReport, Report, ReportReason, ReportStatus, TargetType};
use crate::domains::reports::priority::calculate_priority;
use crate::kernel::deps::ModerationDeps;
use crate::kernel::traits::event_types;

/// Maximum reports one reporter may file inside the rolling window,
/// across all report types combined.
pub const REPORT_RATE_LIMIT: i64 = 10;
/// Rolling rate-limit window, in milliseconds (24 hours).
pub const REPORT_RATE_WINDOW_MS: i64 = 86_400_000;

/// Lookback for duplicate detection (same reporter, target, and reason).
const DUPLICATE_LOOKBACK_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct SubmitReportParams {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
}

/// Submit a report against content or a user profile.
///
/// This action:
/// 1. Verifies the target exists
/// 2. Rejects user-profile reports against administrators (logged as a
///    security event; content owned by an admin may still be reported)
/// 3. Rejects duplicates (same reporter + target + reason in the lookback)
/// 4. Enforces the rolling 24h rate limit per reporter
/// 5. Computes queue priority from the reason and persists as pending
pub async fn submit_report(
    deps: &ModerationDeps,
    actor: AuthUser,
    params: SubmitReportParams,
) -> Result<Report, ModerationError> {
    let now = Utc::now();

    let exists = deps
        .store
        .target_exists(params.target_type, params.target_id)
        .await?;
    if !exists {
        return Err(ModerationError::NotFound(format!(
            "{} {} does not exist",
            params.target_type.as_str(),
            params.target_id
        )));
    }

    // Admin profiles cannot be reported. This only applies to user-profile
    // reports; content targets are never checked against their owner's role.
    if params.target_type == TargetType::User {
        let target_is_admin = deps.roles.has_role(params.target_id, Role::Admin).await?;
        if target_is_admin {
            Guard::new(deps, actor)
                .record_event(
                    event_types::ADMIN_REPORT_ATTEMPT,
                    json!({ "targetUserId": params.target_id }),
                )
                .await;
            return Err(ModerationError::Validation(
                "administrator profiles cannot be reported".to_string(),
            ));
        }
    }

    let duplicate_since = now - Duration::hours(DUPLICATE_LOOKBACK_HOURS);
    let duplicate = deps
        .store
        .duplicate_report_exists(
            actor.user_id,
            params.target_type,
            params.target_id,
            params.reason,
            duplicate_since,
        )
        .await?;
    if duplicate {
        return Err(ModerationError::Validation(
            "an identical report was already submitted recently".to_string(),
        ));
    }

    let window_start = now - Duration::milliseconds(REPORT_RATE_WINDOW_MS);
    let recent = deps
        .store
        .count_reports_since(actor.user_id, window_start)
        .await?;
    if recent >= REPORT_RATE_LIMIT {
        return Err(ModerationError::Validation(format!(
            "report limit of {REPORT_RATE_LIMIT} per 24 hours reached"
        )));
    }

    let report = deps
        .store
        .insert_report(NewReport {
            reporter_id: actor.user_id,
            target_type: params.target_type,
            target_id: params.target_id,
            reason: params.reason,
            description: params.description,
            priority: calculate_priority(params.reason),
            status: ReportStatus::Pending,
            moderator_flagged: false,
        })
        .await?;

    info!(
        report_id = %report.id,
        target_type = report.target_type.as_str(),
        priority = report.priority,
        "report submitted"
    );
    Ok(report)
}
