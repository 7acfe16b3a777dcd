//! Moderator flag action - fast-path intake that skips the reporting queue

use tracing::info;
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError};
use crate::domains::moderation::guards::Guard;
use crate::domains::reports::models::{NewReport, Report, ReportReason, ReportStatus, TargetType};
use crate::kernel::deps::ModerationDeps;

#[derive(Debug, Clone)]
pub struct FlagContentParams {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
}

/// Flag content as a moderator.
///
/// Flagged reports bypass the intake rules for ordinary reports (no rate
/// limit, no duplicate check) and enter the queue at top priority with
/// status under_review so they sort ahead of user reports.
pub async fn moderator_flag_content(
    deps: &ModerationDeps,
    actor: AuthUser,
    params: FlagContentParams,
) -> Result<Report, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("flag_content")
        .await?;

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

    let report = deps
        .store
        .insert_report(NewReport {
            reporter_id: actor.user_id,
            target_type: params.target_type,
            target_id: params.target_id,
            reason: params.reason,
            description: params.description,
            priority: 1,
            status: ReportStatus::UnderReview,
            moderator_flagged: true,
        })
        .await?;

    info!(report_id = %report.id, moderator_id = %actor.user_id, "content flagged");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Role;
    use crate::kernel::test_dependencies::{InMemoryStore, TestDependencies};
    use crate::kernel::traits::event_types;

    #[tokio::test]
    async fn test_flagged_report_enters_queue_at_top_priority() {
        let post_id = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_post(post_id));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let report = moderator_flag_content(
            &deps,
            moderator,
            FlagContentParams {
                target_type: TargetType::Post,
                target_id: post_id,
                reason: ReportReason::HateSpeech,
                description: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(report.priority, 1);
        assert_eq!(report.status, ReportStatus::UnderReview);
        assert!(report.moderator_flagged);
    }

    #[tokio::test]
    async fn test_non_moderator_cannot_flag() {
        let post_id = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_post(post_id));
        let deps = test_deps.deps();

        let err = moderator_flag_content(
            &deps,
            AuthUser::new(Uuid::new_v4()),
            FlagContentParams {
                target_type: TargetType::Post,
                target_id: post_id,
                reason: ReportReason::Spam,
                description: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(
            test_deps
                .events
                .recorded_of_type(event_types::UNAUTHORIZED_MODERATION_ATTEMPT)
                .len(),
            1
        );
    }
}
