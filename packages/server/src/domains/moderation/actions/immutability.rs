//! Reversal tamper evidence - verification of revoked records, a diagnostic
//! mutation probe, and pattern scanning over the security event log

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{error, warn};
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError, Role};
use crate::domains::moderation::guards::Guard;
use crate::domains::moderation::models::RevocationUpdate;
use crate::kernel::deps::ModerationDeps;
use crate::kernel::traits::{event_types, SecurityEvent};

const DEFAULT_SCAN_WINDOW_HOURS: i64 = 24;

/// Result of recomputing the immutability invariants of one action record.
#[derive(Debug, Clone, juniper::GraphQLObject)]
pub struct ImmutabilityReport {
    pub action_id: Uuid,
    pub is_immutable: bool,
    pub violations: Vec<String>,
}

/// Outcome of a diagnostic modification probe. `prevented` should always be
/// true; false means the storage guard failed.
#[derive(Debug, Clone, juniper::GraphQLObject)]
pub struct ModificationAttempt {
    pub action_id: Uuid,
    pub prevented: bool,
}

/// Fields a modification probe tries to overwrite.
#[derive(Debug, Clone, Default, juniper::GraphQLInputObject)]
pub struct ReversalPatch {
    pub revoked_at: Option<chrono::DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
    pub reversal_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, juniper::GraphQLEnum)]
pub enum PatternSeverity {
    Medium,
    High,
    Critical,
}

/// One suspicious pattern matched in the security event log.
#[derive(Debug, Clone, juniper::GraphQLObject)]
pub struct SuspiciousPattern {
    pub severity: PatternSeverity,
    pub pattern: String,
    pub description: String,
}

/// Recompute the immutability invariants of a revoked action.
///
/// Checks: revoked_at/revoked_by set together or not at all, a reversal
/// reason present when revoked, revoked_at not in the future and not before
/// the action was created. A never-reversed action is trivially immutable.
/// Any violation is logged as a security event.
pub async fn verify_reversal_immutability(
    deps: &ModerationDeps,
    actor: AuthUser,
    action_id: Uuid,
) -> Result<ImmutabilityReport, ModerationError> {
    let guard = Guard::new(deps, actor);
    guard.verify_moderator_role("verify_reversal_immutability").await?;

    let action = deps
        .store
        .find_action(action_id)
        .await?
        .ok_or_else(|| ModerationError::NotFound(format!("action {action_id} does not exist")))?;

    let mut violations = Vec::new();
    match (action.revoked_at, action.revoked_by) {
        (Some(_), None) => {
            violations.push("revoked_at is set without revoked_by".to_string());
        }
        (None, Some(_)) => {
            violations.push("revoked_by is set without revoked_at".to_string());
        }
        _ => {}
    }
    if let Some(revoked_at) = action.revoked_at {
        if action.metadata.reversal.is_none() {
            violations.push("revoked action has no reversal reason".to_string());
        }
        if revoked_at > Utc::now() {
            violations.push("revoked_at is in the future".to_string());
        }
        if revoked_at < action.created_at {
            violations.push("revoked_at precedes the action's creation".to_string());
        }
    }

    if !violations.is_empty() {
        guard
            .record_event(
                event_types::REVERSAL_IMMUTABILITY_VIOLATION,
                json!({ "actionId": action_id, "violations": violations }),
            )
            .await;
        error!(action_id = %action_id, ?violations, "reversal immutability violation");
    }

    Ok(ImmutabilityReport {
        action_id,
        is_immutable: violations.is_empty(),
        violations,
    })
}

/// Diagnostic probe: attempt to overwrite the revocation fields of an
/// already-reversed action. The attempt itself is always logged; the storage
/// guard is expected to prevent the write. A write that goes through is a
/// critical breach, logged and escalated to every admin.
pub async fn attempt_reversal_modification(
    deps: &ModerationDeps,
    actor: AuthUser,
    action_id: Uuid,
    patch: ReversalPatch,
) -> Result<ModificationAttempt, ModerationError> {
    let guard = Guard::new(deps, actor);
    guard.verify_moderator_role("attempt_reversal_modification").await?;

    guard
        .record_event(
            event_types::REVERSAL_MODIFICATION_ATTEMPT,
            json!({
                "actionId": action_id,
                "patchedFields": {
                    "revokedAt": patch.revoked_at.is_some(),
                    "revokedBy": patch.revoked_by.is_some(),
                    "reversalReason": patch.reversal_reason.is_some(),
                },
            }),
        )
        .await;

    let action = deps
        .store
        .find_action(action_id)
        .await?
        .ok_or_else(|| ModerationError::NotFound(format!("action {action_id} does not exist")))?;
    if !action.is_revoked() {
        return Err(ModerationError::Validation(
            "action is not reversed; there are no revocation fields to probe".to_string(),
        ));
    }

    let mut metadata = action.metadata.0.clone();
    if let (Some(reason), Some(reversal)) = (patch.reversal_reason, metadata.reversal.as_mut()) {
        reversal.reversal_reason = reason;
    }
    let update = RevocationUpdate {
        revoked_at: patch.revoked_at.unwrap_or_else(Utc::now),
        revoked_by: patch.revoked_by.unwrap_or(actor.user_id),
        metadata,
    };

    let written = deps.store.overwrite_revocation(action_id, update).await?;
    if written {
        guard
            .record_event(
                event_types::REVERSAL_MODIFICATION_SUCCEEDED,
                json!({ "actionId": action_id }),
            )
            .await;
        error!(action_id = %action_id, "revocation fields were overwritten");
        alert_admins(
            deps,
            "CRITICAL: reversal record modified",
            &format!("Revocation fields of action {action_id} were overwritten."),
            json!({ "actionId": action_id }),
        )
        .await;
    }

    Ok(ModificationAttempt {
        action_id,
        prevented: !written,
    })
}

/// Scan the security event log for reversal-tampering patterns.
///
/// Matched patterns: five or more modification attempts by one user in the
/// window (medium), any successful modification (critical), five attempts
/// within one second (high, automation signature), and any logged
/// immutability violation (high). Any match triggers an admin alert.
pub async fn detect_suspicious_reversal_activity(
    deps: &ModerationDeps,
    actor: AuthUser,
    user_id: Option<Uuid>,
    window_hours: Option<i32>,
) -> Result<Vec<SuspiciousPattern>, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("detect_suspicious_reversal_activity")
        .await?;

    let window = Duration::hours(window_hours.map(i64::from).unwrap_or(DEFAULT_SCAN_WINDOW_HOURS));
    let events = deps
        .security_events
        .events_since(user_id, Utc::now() - window)
        .await?;

    let attempts: Vec<&SecurityEvent> = events
        .iter()
        .filter(|e| e.event_type == event_types::REVERSAL_MODIFICATION_ATTEMPT)
        .collect();

    let mut patterns = Vec::new();

    let mut per_user: std::collections::HashMap<Option<Uuid>, usize> =
        std::collections::HashMap::new();
    for attempt in &attempts {
        *per_user.entry(attempt.user_id).or_default() += 1;
    }
    for (user, count) in per_user {
        if count >= 5 {
            patterns.push(SuspiciousPattern {
                severity: PatternSeverity::Medium,
                pattern: "repeated_modification_attempts".to_string(),
                description: format!(
                    "{count} reversal modification attempts by user {} in the window",
                    user.map(|u| u.to_string()).unwrap_or_else(|| "unknown".to_string())
                ),
            });
        }
    }

    if events
        .iter()
        .any(|e| e.event_type == event_types::REVERSAL_MODIFICATION_SUCCEEDED)
    {
        patterns.push(SuspiciousPattern {
            severity: PatternSeverity::Critical,
            pattern: "successful_modification".to_string(),
            description: "a reversal record modification went through".to_string(),
        });
    }

    // Burst detection over attempts, which arrive oldest-first.
    if attempts.len() >= 5
        && attempts.windows(5).any(|w| {
            w[4].created_at - w[0].created_at <= Duration::seconds(1)
        })
    {
        patterns.push(SuspiciousPattern {
            severity: PatternSeverity::High,
            pattern: "automation_signature".to_string(),
            description: "5 modification attempts within one second".to_string(),
        });
    }

    if events
        .iter()
        .any(|e| e.event_type == event_types::REVERSAL_IMMUTABILITY_VIOLATION)
    {
        patterns.push(SuspiciousPattern {
            severity: PatternSeverity::High,
            pattern: "immutability_violation".to_string(),
            description: "immutability violations were raised in the window".to_string(),
        });
    }

    if !patterns.is_empty() {
        alert_admins(
            deps,
            "Suspicious reversal activity detected",
            &format!("{} suspicious pattern(s) matched", patterns.len()),
            json!({
                "patterns": patterns.iter().map(|p| p.pattern.clone()).collect::<Vec<_>>(),
            }),
        )
        .await;
    }

    Ok(patterns)
}

/// Notify every admin-role user. Best-effort; failures are logged per admin.
async fn alert_admins(deps: &ModerationDeps, title: &str, message: &str, data: serde_json::Value) {
    let admins = match deps.roles.users_with_role(Role::Admin).await {
        Ok(admins) => admins,
        Err(err) => {
            error!(%err, "could not enumerate admins for alert");
            return;
        }
    };
    for admin_id in admins {
        if let Err(err) = deps
            .notifications
            .send(admin_id, title, message, data.clone())
            .await
        {
            warn!(%err, %admin_id, "admin alert delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::moderation::actions::revoke_action::revoke_action;
    use crate::domains::moderation::actions::take_action::{
        take_moderation_action, ModerationActionParams,
    };
    use crate::domains::moderation::models::ActionType;
    use crate::domains::reports::models::TargetType;
    use crate::kernel::test_dependencies::{InMemoryStore, TestDependencies};

    async fn revoked_action_fixture() -> (TestDependencies, AuthUser, Uuid) {
        let target = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_user(target));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let action = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                action_type: ActionType::UserWarned,
                target_type: TargetType::User,
                target_id: target,
                target_user_id: target,
                reason: "warning".to_string(),
                internal_notes: None,
                report_id: None,
                cascading: None,
                restriction_kind: None,
                restriction_expires_at: None,
            },
        )
        .await
        .unwrap()
        .action;
        revoke_action(&deps, moderator, action.id, "appeal upheld".into())
            .await
            .unwrap();
        (test_deps, moderator, action.id)
    }

    #[tokio::test]
    async fn test_clean_reversed_action_is_immutable() {
        let (test_deps, moderator, action_id) = revoked_action_fixture().await;
        let deps = test_deps.deps();

        let report = verify_reversal_immutability(&deps, moderator, action_id)
            .await
            .unwrap();
        assert!(report.is_immutable);
        assert!(report.violations.is_empty());
        assert!(test_deps
            .events
            .recorded_of_type(event_types::REVERSAL_IMMUTABILITY_VIOLATION)
            .is_empty());
    }

    #[tokio::test]
    async fn test_modification_attempt_is_prevented_and_logged() {
        let (test_deps, moderator, action_id) = revoked_action_fixture().await;
        let deps = test_deps.deps();

        let attempt = attempt_reversal_modification(
            &deps,
            moderator,
            action_id,
            ReversalPatch {
                reversal_reason: Some("rewritten history".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(attempt.prevented);
        assert_eq!(
            test_deps
                .events
                .recorded_of_type(event_types::REVERSAL_MODIFICATION_ATTEMPT)
                .len(),
            1
        );
        assert!(test_deps
            .events
            .recorded_of_type(event_types::REVERSAL_MODIFICATION_SUCCEEDED)
            .is_empty());

        // The stored record kept its original reversal fields.
        let stored = deps.store.find_action(action_id).await.unwrap().unwrap();
        assert_eq!(
            stored.metadata.reversal.as_ref().unwrap().reversal_reason,
            "appeal upheld"
        );
    }

    #[tokio::test]
    async fn test_probing_unreversed_action_is_validation_error() {
        let target = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_user(target));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let action = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                action_type: ActionType::UserWarned,
                target_type: TargetType::User,
                target_id: target,
                target_user_id: target,
                reason: "warning".to_string(),
                internal_notes: None,
                report_id: None,
                cascading: None,
                restriction_kind: None,
                restriction_expires_at: None,
            },
        )
        .await
        .unwrap()
        .action;

        let err =
            attempt_reversal_modification(&deps, moderator, action.id, ReversalPatch::default())
                .await
                .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_repeated_attempts_match_medium_pattern_and_alert_admins() {
        let (test_deps, moderator, action_id) = revoked_action_fixture().await;
        let admin = Uuid::new_v4();
        test_deps.roles.grant(admin, Role::Admin);
        let deps = test_deps.deps();

        for _ in 0..5 {
            attempt_reversal_modification(&deps, moderator, action_id, ReversalPatch::default())
                .await
                .unwrap();
        }

        let patterns =
            detect_suspicious_reversal_activity(&deps, moderator, Some(moderator.user_id), None)
                .await
                .unwrap();

        assert!(patterns
            .iter()
            .any(|p| p.pattern == "repeated_modification_attempts"
                && p.severity == PatternSeverity::Medium));
        // Five attempts in quick succession also trip the automation signature.
        assert!(patterns
            .iter()
            .any(|p| p.pattern == "automation_signature" && p.severity == PatternSeverity::High));

        let alerts = test_deps.notifications.sent();
        assert!(alerts.iter().any(|n| n.user_id == admin));
    }

    #[tokio::test]
    async fn test_quiet_log_matches_nothing() {
        let (test_deps, moderator, _) = revoked_action_fixture().await;
        let deps = test_deps.deps();

        let patterns = detect_suspicious_reversal_activity(&deps, moderator, None, Some(1))
            .await
            .unwrap();
        assert!(patterns.is_empty());
        assert!(!test_deps
            .notifications
            .sent()
            .iter()
            .any(|n| n.title == "Suspicious reversal activity detected"));
    }
}
