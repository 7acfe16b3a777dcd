//! Revoke action - reverses a moderation decision while keeping the full
//! audit trail intact

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError};
use crate::domains::moderation::guards::Guard;
use crate::domains::moderation::models::{
    ActionType, ModerationAction, ReversalMetadata, RevocationUpdate, StateChangeEntry,
    StateChangeKind,
};
use crate::kernel::deps::ModerationDeps;
use crate::kernel::traits::event_types;

/// Reverse a moderation action.
///
/// This action:
/// 1. Verifies the actor's role (ban reversal is admin-only) and protects
///    admin-held target accounts
/// 2. Rejects a second reversal of the same action
/// 3. Appends a `reversed` entry to the state history (synthesizing the
///    original `applied` entry for records that predate state tracking)
/// 4. Sets the revocation fields in one compare-and-set update, so a racing
///    reversal loses cleanly instead of overwriting history
/// 5. Deactivates the linked restriction, when one exists
///
/// Self-reversal (a moderator undoing their own action) is allowed but
/// flagged in the metadata and logged as a security event.
pub async fn revoke_action(
    deps: &ModerationDeps,
    actor: AuthUser,
    action_id: Uuid,
    reversal_reason: String,
) -> Result<ModerationAction, ModerationError> {
    let guard = Guard::new(deps, actor);
    guard.verify_moderator_role("revoke_action").await?;

    if reversal_reason.trim().is_empty() {
        return Err(ModerationError::Validation(
            "a reason is required to reverse an action".to_string(),
        ));
    }

    let action = deps
        .store
        .find_action(action_id)
        .await?
        .ok_or_else(|| ModerationError::NotFound(format!("action {action_id} does not exist")))?;

    if action.is_revoked() {
        return Err(ModerationError::Validation(
            "action has already been reversed".to_string(),
        ));
    }
    if action.action_type == ActionType::UserBanned {
        guard
            .verify_admin_role(event_types::UNAUTHORIZED_BAN_REVOKE_ATTEMPT, "remove_ban")
            .await?;
    }
    guard
        .verify_not_admin_target(action.target_user_id, "revoke_action")
        .await?;

    let now = Utc::now();
    let is_self_reversal = guard.is_self_reversal(&action);

    let mut metadata = action.metadata.0.clone();
    if metadata.state_changes.is_empty() {
        // Records written before state tracking get their original
        // application synthesized so the history always starts at `applied`.
        metadata.state_changes.push(StateChangeEntry {
            timestamp: action.created_at,
            action: StateChangeKind::Applied,
            by_user_id: action.moderator_id,
            reason: action.reason.clone(),
            is_self_action: false,
        });
    }
    metadata.state_changes.push(StateChangeEntry {
        timestamp: now,
        action: StateChangeKind::Reversed,
        by_user_id: actor.user_id,
        reason: reversal_reason.clone(),
        is_self_action: is_self_reversal,
    });
    metadata.reversal = Some(ReversalMetadata {
        reversal_reason: reversal_reason.clone(),
        is_self_reversal,
    });

    let revoked = deps
        .store
        .mark_revoked(
            action_id,
            RevocationUpdate {
                revoked_at: now,
                revoked_by: actor.user_id,
                metadata,
            },
        )
        .await?
        .ok_or_else(|| {
            // Lost a race against another reversal between the read above and
            // the guarded update.
            ModerationError::Validation("action has already been reversed".to_string())
        })?;

    if is_self_reversal {
        guard
            .record_event(
                &format!("self_reversal_{}", action.action_type.as_str()),
                json!({
                    "actionId": action_id,
                    "actionType": action.action_type.as_str(),
                }),
            )
            .await;
    }

    if let Some(restriction) = deps.store.find_restriction_by_action(action_id).await? {
        if restriction.active {
            deps.store.deactivate_restriction(restriction.id).await?;
        }
    }

    if let Err(err) = deps
        .notifications
        .send(
            revoked.target_user_id,
            "Moderation action reversed",
            &reversal_reason,
            json!({ "actionId": action_id }),
        )
        .await
    {
        warn!(%err, action_id = %action_id, "reversal notification failed");
    }

    info!(
        action_id = %action_id,
        revoked_by = %actor.user_id,
        is_self_reversal,
        "moderation action reversed"
    );
    Ok(revoked)
}

/// Reverse a suspension. Rejects actions of any other type.
pub async fn lift_suspension(
    deps: &ModerationDeps,
    actor: AuthUser,
    action_id: Uuid,
    reason: String,
) -> Result<ModerationAction, ModerationError> {
    require_action_type(deps, action_id, ActionType::UserSuspended).await?;
    revoke_action(deps, actor, action_id, reason).await
}

/// Reverse a ban. Admin-only, enforced inside `revoke_action`.
pub async fn remove_ban(
    deps: &ModerationDeps,
    actor: AuthUser,
    action_id: Uuid,
    reason: String,
) -> Result<ModerationAction, ModerationError> {
    require_action_type(deps, action_id, ActionType::UserBanned).await?;
    revoke_action(deps, actor, action_id, reason).await
}

/// Reverse an applied restriction.
pub async fn remove_user_restriction(
    deps: &ModerationDeps,
    actor: AuthUser,
    action_id: Uuid,
    reason: String,
) -> Result<ModerationAction, ModerationError> {
    require_action_type(deps, action_id, ActionType::RestrictionApplied).await?;
    revoke_action(deps, actor, action_id, reason).await
}

async fn require_action_type(
    deps: &ModerationDeps,
    action_id: Uuid,
    expected: ActionType,
) -> Result<(), ModerationError> {
    let action = deps
        .store
        .find_action(action_id)
        .await?
        .ok_or_else(|| ModerationError::NotFound(format!("action {action_id} does not exist")))?;
    if action.action_type != expected {
        return Err(ModerationError::Validation(format!(
            "action {} is {}, not {}",
            action_id,
            action.action_type.as_str(),
            expected.as_str()
        )));
    }
    Ok(())
}
