//! Offender detection - repeat-offender checks and violation timelines

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError};
use crate::domains::moderation::guards::Guard;
use crate::kernel::deps::ModerationDeps;

/// Actions inside this lookback make a user a repeat offender.
const REPEAT_OFFENDER_THRESHOLD: usize = 3;
const REPEAT_OFFENDER_WINDOW_DAYS: i64 = 30;

/// Cumulative violation counts over the standard lookback buckets. Buckets
/// are inclusive: an action at exactly the 7-day boundary counts in the
/// 7-day bucket (and therefore in the 30- and 90-day buckets too).
#[derive(Debug, Clone, PartialEq, juniper::GraphQLObject)]
pub struct ViolationTimeline {
    pub last_7_days: i32,
    pub last_30_days: i32,
    pub last_90_days: i32,
    pub message: String,
}

/// Id handling shared by the detection entry points: an empty or whitespace
/// id means "no such user, nothing to report" (Ok(None)); a malformed
/// non-empty id is a validation error.
fn parse_subject_id(user_id: &str) -> Result<Option<Uuid>, ModerationError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Uuid::parse_str(trimmed)
        .map(Some)
        .map_err(|_| ModerationError::Validation(format!("malformed user id: {trimmed}")))
}

/// Whether a user accumulated three or more moderation actions in the last
/// 30 days. An empty id is answered with `false` rather than an error.
pub async fn detect_repeat_offender(
    deps: &ModerationDeps,
    actor: AuthUser,
    user_id: &str,
) -> Result<bool, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("detect_repeat_offender")
        .await?;

    let Some(user_id) = parse_subject_id(user_id)? else {
        return Ok(false);
    };

    let since = Utc::now() - Duration::days(REPEAT_OFFENDER_WINDOW_DAYS);
    let actions = deps.store.actions_targeting_since(user_id, since).await?;
    Ok(actions.len() >= REPEAT_OFFENDER_THRESHOLD)
}

/// Bucket a user's moderation actions into 7/30/90-day windows.
///
/// The message reports the tightest non-empty bucket, with plain-English
/// pluralization. An empty id yields no timeline at all.
pub async fn calculate_violation_timeline(
    deps: &ModerationDeps,
    actor: AuthUser,
    user_id: &str,
) -> Result<Option<ViolationTimeline>, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("calculate_violation_timeline")
        .await?;

    let Some(user_id) = parse_subject_id(user_id)? else {
        return Ok(None);
    };

    let now = Utc::now();
    let actions = deps
        .store
        .actions_targeting_since(user_id, now - Duration::days(90))
        .await?;

    let count_within = |days: i64| {
        actions
            .iter()
            .filter(|a| a.created_at >= now - Duration::days(days))
            .count() as i32
    };
    let last_7_days = count_within(7);
    let last_30_days = count_within(30);
    let last_90_days = count_within(90);

    let message = if last_7_days > 0 {
        format!("{last_7_days} {} in last 7 days", pluralize(last_7_days))
    } else if last_30_days > 0 {
        format!("{last_30_days} {} in last 30 days", pluralize(last_30_days))
    } else if last_90_days > 0 {
        format!("{last_90_days} {} in last 90 days", pluralize(last_90_days))
    } else {
        "No violations in last 90 days".to_string()
    };

    Ok(Some(ViolationTimeline {
        last_7_days,
        last_30_days,
        last_90_days,
        message,
    }))
}

fn pluralize(count: i32) -> &'static str {
    if count == 1 {
        "violation"
    } else {
        "violations"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Role;
    use crate::domains::moderation::models::{ActionMetadata, ActionType, ModerationAction};
    use crate::domains::reports::models::TargetType;
    use crate::kernel::test_dependencies::TestDependencies;
    use sqlx::types::Json;

    fn action_days_ago(target: Uuid, days: i64) -> ModerationAction {
        let moderator = Uuid::new_v4();
        ModerationAction {
            id: Uuid::new_v4(),
            moderator_id: moderator,
            target_user_id: target,
            action_type: ActionType::UserWarned,
            target_type: TargetType::User,
            target_id: target,
            reason: "warning".to_string(),
            internal_notes: None,
            metadata: Json(ActionMetadata::default()),
            notification_sent: false,
            created_at: Utc::now() - Duration::days(days),
            revoked_at: None,
            revoked_by: None,
        }
    }

    fn setup() -> (TestDependencies, AuthUser) {
        let test_deps = TestDependencies::new();
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        (test_deps, moderator)
    }

    #[tokio::test]
    async fn test_three_actions_in_window_is_repeat_offender() {
        let (test_deps, moderator) = setup();
        let target = Uuid::new_v4();
        for days in [1, 10, 29] {
            test_deps.store.seed_action(action_days_ago(target, days));
        }
        let deps = test_deps.deps();

        assert!(detect_repeat_offender(&deps, moderator, &target.to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_two_recent_actions_is_not_repeat_offender() {
        let (test_deps, moderator) = setup();
        let target = Uuid::new_v4();
        test_deps.store.seed_action(action_days_ago(target, 1));
        test_deps.store.seed_action(action_days_ago(target, 10));
        // Outside the 30-day window, does not count.
        test_deps.store.seed_action(action_days_ago(target, 45));
        let deps = test_deps.deps();

        assert!(!detect_repeat_offender(&deps, moderator, &target.to_string())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_id_is_false_malformed_id_is_error() {
        let (test_deps, moderator) = setup();
        let deps = test_deps.deps();

        assert!(!detect_repeat_offender(&deps, moderator, "").await.unwrap());
        assert!(!detect_repeat_offender(&deps, moderator, "   ").await.unwrap());

        let err = detect_repeat_offender(&deps, moderator, "not-a-uuid")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_timeline_buckets_are_cumulative() {
        let (test_deps, moderator) = setup();
        let target = Uuid::new_v4();
        for days in [3, 5, 15, 60] {
            test_deps.store.seed_action(action_days_ago(target, days));
        }
        let deps = test_deps.deps();

        let timeline = calculate_violation_timeline(&deps, moderator, &target.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(timeline.last_7_days, 2);
        assert_eq!(timeline.last_30_days, 3);
        assert_eq!(timeline.last_90_days, 4);
        assert_eq!(timeline.message, "2 violations in last 7 days");
    }

    #[tokio::test]
    async fn test_timeline_message_falls_back_through_buckets() {
        let (test_deps, moderator) = setup();
        let target = Uuid::new_v4();
        test_deps.store.seed_action(action_days_ago(target, 20));
        let deps = test_deps.deps();

        let timeline = calculate_violation_timeline(&deps, moderator, &target.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(timeline.message, "1 violation in last 30 days");

        let clean = calculate_violation_timeline(&deps, moderator, &Uuid::new_v4().to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(clean.message, "No violations in last 90 days");
    }

    #[tokio::test]
    async fn test_timeline_id_handling_matches_repeat_offender() {
        let (test_deps, moderator) = setup();
        let deps = test_deps.deps();

        assert!(calculate_violation_timeline(&deps, moderator, "")
            .await
            .unwrap()
            .is_none());
        assert!(calculate_violation_timeline(&deps, moderator, "   ")
            .await
            .unwrap()
            .is_none());

        let err = calculate_violation_timeline(&deps, moderator, "not-a-uuid")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
