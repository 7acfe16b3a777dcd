//! Take moderation action - applies a moderator decision to its target,
//! cascading across an album's tracks when requested

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError};
use crate::domains::moderation::guards::Guard;
use crate::domains::moderation::models::{
    ActionMetadata, ActionType, CascadeLineage, ModerationAction, NewAction, NewRestriction,
    RestrictionKind,
};
use crate::domains::reports::models::{Report, TargetType};
use crate::kernel::deps::ModerationDeps;
use crate::kernel::traits::event_types;

/// Album cascade controls. `remove_tracks` selects between a full cascade
/// (1+N action records, tracks deleted) and selective deletion (one record,
/// album removed, tracks kept).
#[derive(Debug, Clone, Copy)]
pub struct CascadingOptions {
    pub remove_album: bool,
    pub remove_tracks: bool,
}

#[derive(Debug, Clone)]
pub struct ModerationActionParams {
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub target_user_id: Uuid,
    pub reason: String,
    pub internal_notes: Option<String>,
    pub report_id: Option<Uuid>,
    pub cascading: Option<CascadingOptions>,
    pub restriction_kind: Option<RestrictionKind>,
    pub restriction_expires_at: Option<DateTime<Utc>>,
}

/// Everything one `take_moderation_action` call produced.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: ModerationAction,
    pub cascaded_actions: Vec<ModerationAction>,
    pub resolved_report: Option<Report>,
}

/// Apply a moderation action.
///
/// This action:
/// 1. Verifies the actor's role (bans are admin-only) and protects
///    admin-held target accounts
/// 2. Writes the audit record(s) first, atomically for a cascade
/// 3. Only then mutates content (removal, album cascade)
/// 4. Creates a linked restriction for suspensions, bans, and restrictions
/// 5. Resolves the originating report, when one was given
/// 6. Notifies the target user, fire-and-forget
pub async fn take_moderation_action(
    deps: &ModerationDeps,
    actor: AuthUser,
    params: ModerationActionParams,
) -> Result<ActionOutcome, ModerationError> {
    let guard = Guard::new(deps, actor);
    guard.verify_moderator_role("take_moderation_action").await?;
    if params.action_type == ActionType::UserBanned {
        guard
            .verify_admin_role(
                event_types::UNAUTHORIZED_ADMIN_ACTION_ATTEMPT,
                "user_banned",
            )
            .await?;
    }
    guard
        .verify_not_admin_target(params.target_user_id, params.action_type.as_str())
        .await?;

    if params.reason.trim().is_empty() {
        return Err(ModerationError::Validation(
            "a reason is required for every moderation action".to_string(),
        ));
    }
    if params.action_type == ActionType::RestrictionApplied && params.restriction_kind.is_none() {
        return Err(ModerationError::Validation(
            "restriction_applied requires a restriction kind".to_string(),
        ));
    }
    // The originating report must exist before any record is written. An
    // already-resolved report is fine; resolve_report below just leaves it.
    if let Some(report_id) = params.report_id {
        deps.store
            .find_report(report_id)
            .await?
            .ok_or_else(|| {
                ModerationError::NotFound(format!("report {report_id} does not exist"))
            })?;
    }

    let cascade = params
        .cascading
        .filter(|_| params.target_type == TargetType::Album);

    let (action, cascaded_actions) = match cascade {
        // Log-only: the action is recorded, nothing is deleted.
        Some(options) if !options.remove_album => {
            (insert_single_action(deps, actor, &params).await?, Vec::new())
        }
        Some(options) if options.remove_tracks => {
            apply_album_cascade(deps, actor, &params).await?
        }
        Some(_) => {
            // Selective deletion: one album-scoped record, tracks preserved.
            let action = insert_single_action(deps, actor, &params).await?;
            deps.store.remove_album(params.target_id, false).await?;
            (action, Vec::new())
        }
        None => {
            let action = insert_single_action(deps, actor, &params).await?;
            if params.action_type == ActionType::ContentRemoved {
                deps.store
                    .remove_content(params.target_type, params.target_id)
                    .await?;
            }
            (action, Vec::new())
        }
    };

    if matches!(
        params.action_type,
        ActionType::UserSuspended | ActionType::UserBanned | ActionType::RestrictionApplied
    ) {
        deps.store
            .insert_restriction(NewRestriction {
                action_id: action.id,
                user_id: action.target_user_id,
                kind: params.restriction_kind.unwrap_or(RestrictionKind::Posting),
                expires_at: params.restriction_expires_at,
            })
            .await?;
    }

    let resolved_report = match params.report_id {
        Some(report_id) => {
            deps.store
                .resolve_report(report_id, actor.user_id, Utc::now())
                .await?
        }
        None => None,
    };

    notify_action_taken(deps, &action).await;

    info!(
        action_id = %action.id,
        action_type = action.action_type.as_str(),
        moderator_id = %actor.user_id,
        cascaded = cascaded_actions.len(),
        "moderation action applied"
    );
    Ok(ActionOutcome {
        action,
        cascaded_actions,
        resolved_report,
    })
}

async fn insert_single_action(
    deps: &ModerationDeps,
    actor: AuthUser,
    params: &ModerationActionParams,
) -> Result<ModerationAction, ModerationError> {
    let inserted = deps
        .store
        .insert_actions(vec![NewAction {
            id: Uuid::new_v4(),
            moderator_id: actor.user_id,
            target_user_id: params.target_user_id,
            action_type: params.action_type,
            target_type: params.target_type,
            target_id: params.target_id,
            reason: params.reason.clone(),
            internal_notes: params.internal_notes.clone(),
            metadata: ActionMetadata::default(),
            notification_sent: false,
        }])
        .await?;
    inserted
        .into_iter()
        .next()
        .ok_or_else(|| ModerationError::unexpected(anyhow::anyhow!("insert returned no rows")))
}

/// Full album cascade: one album-scoped record plus one per child track, all
/// written in a single batch, then the album and its tracks are deleted.
async fn apply_album_cascade(
    deps: &ModerationDeps,
    actor: AuthUser,
    params: &ModerationActionParams,
) -> Result<(ModerationAction, Vec<ModerationAction>), ModerationError> {
    let album = deps
        .store
        .find_album(params.target_id)
        .await?
        .ok_or_else(|| {
            ModerationError::NotFound(format!("album {} does not exist", params.target_id))
        })?;

    // Parent id is generated up front so child records can reference it
    // inside the same batch.
    let parent_id = Uuid::new_v4();
    let mut batch = vec![NewAction {
        id: parent_id,
        moderator_id: actor.user_id,
        target_user_id: album.owner_id,
        action_type: params.action_type,
        target_type: TargetType::Album,
        target_id: album.album_id,
        reason: params.reason.clone(),
        internal_notes: params.internal_notes.clone(),
        metadata: ActionMetadata::with_lineage(CascadeLineage::parent(album.track_ids.clone())),
        notification_sent: false,
    }];
    for track_id in &album.track_ids {
        batch.push(NewAction {
            id: Uuid::new_v4(),
            moderator_id: actor.user_id,
            target_user_id: album.owner_id,
            action_type: params.action_type,
            target_type: TargetType::Track,
            target_id: *track_id,
            reason: params.reason.clone(),
            internal_notes: params.internal_notes.clone(),
            metadata: ActionMetadata::with_lineage(CascadeLineage::child(
                parent_id,
                album.album_id,
            )),
            notification_sent: false,
        });
    }

    let mut inserted = deps.store.insert_actions(batch).await?;
    deps.store.remove_album(album.album_id, true).await?;

    let cascaded = inserted.split_off(1);
    let parent = inserted.into_iter().next().ok_or_else(|| {
        ModerationError::unexpected(anyhow::anyhow!("cascade insert returned no rows"))
    })?;
    Ok((parent, cascaded))
}

/// Tell the target user what happened. Delivery failures are logged and never
/// fail the action; the record's notification flag is only set on success.
async fn notify_action_taken(deps: &ModerationDeps, action: &ModerationAction) {
    let result = deps
        .notifications
        .send(
            action.target_user_id,
            "Moderation action taken",
            &action.reason,
            json!({
                "actionId": action.id,
                "actionType": action.action_type.as_str(),
            }),
        )
        .await;
    match result {
        Ok(()) => {
            if let Err(err) = deps.store.set_notification_sent(action.id).await {
                warn!(%err, action_id = %action.id, "failed to record notification delivery");
            }
        }
        Err(err) => {
            warn!(%err, action_id = %action.id, "moderation notification failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Role;
    use crate::kernel::test_dependencies::{InMemoryStore, TestDependencies};
    use crate::kernel::traits::AlbumContext;
    use std::collections::HashSet;

    fn base_params(target_id: Uuid, target_user_id: Uuid) -> ModerationActionParams {
        ModerationActionParams {
            action_type: ActionType::ContentRemoved,
            target_type: TargetType::Post,
            target_id,
            target_user_id,
            reason: "spam content".to_string(),
            internal_notes: None,
            report_id: None,
            cascading: None,
            restriction_kind: None,
            restriction_expires_at: None,
        }
    }

    fn album_fixture(track_count: usize) -> AlbumContext {
        AlbumContext {
            album_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Demo Tapes".to_string(),
            track_ids: (0..track_count).map(|_| Uuid::new_v4()).collect(),
        }
    }

    #[tokio::test]
    async fn test_content_removal_records_then_removes() {
        let post_id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(
            InMemoryStore::new().with_post(post_id).with_user(owner),
        );
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let outcome = take_moderation_action(&deps, moderator, base_params(post_id, owner))
            .await
            .unwrap();

        assert_eq!(outcome.action.action_type, ActionType::ContentRemoved);
        assert!(outcome.cascaded_actions.is_empty());
        assert!(!deps
            .store
            .target_exists(TargetType::Post, post_id)
            .await
            .unwrap());
        // Notification was delivered and flagged on the stored record.
        assert_eq!(test_deps.notifications.sent().len(), 1);
        let stored = deps.store.find_action(outcome.action.id).await.unwrap().unwrap();
        assert!(stored.notification_sent);
    }

    #[tokio::test]
    async fn test_album_cascade_writes_one_plus_n_records() {
        let album = album_fixture(3);
        let album_id = album.album_id;
        let owner = album.owner_id;
        let track_ids = album.track_ids.clone();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_album(album));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let outcome = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                target_type: TargetType::Album,
                target_id: album_id,
                target_user_id: owner,
                cascading: Some(CascadingOptions {
                    remove_album: true,
                    remove_tracks: true,
                }),
                ..base_params(album_id, owner)
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.cascaded_actions.len(), 3);

        // All ids unique across the batch.
        let mut ids: HashSet<Uuid> = HashSet::new();
        ids.insert(outcome.action.id);
        for child in &outcome.cascaded_actions {
            assert!(ids.insert(child.id));
        }

        // Parent record carries the cascade lineage.
        match &outcome.action.metadata.lineage {
            CascadeLineage::Parent {
                cascading_action,
                affected_tracks,
                track_count,
            } => {
                assert!(cascading_action);
                assert_eq!(*track_count, 3);
                assert_eq!(affected_tracks, &track_ids);
            }
            other => panic!("expected parent lineage, got {other:?}"),
        }

        // Children point back at the parent and share owner and reason.
        for child in &outcome.cascaded_actions {
            assert_eq!(child.target_user_id, owner);
            assert_eq!(child.reason, outcome.action.reason);
            match &child.metadata.lineage {
                CascadeLineage::Child {
                    parent_album_action,
                    parent_album_id,
                    cascaded_from_album,
                } => {
                    assert_eq!(*parent_album_action, outcome.action.id);
                    assert_eq!(*parent_album_id, album_id);
                    assert!(cascaded_from_album);
                }
                other => panic!("expected child lineage, got {other:?}"),
            }
        }

        // Album and tracks are gone.
        assert!(!test_deps.store.album_exists(album_id));
        for track_id in track_ids {
            assert!(!test_deps.store.track_exists(track_id));
        }
    }

    #[tokio::test]
    async fn test_selective_album_deletion_keeps_tracks() {
        let album = album_fixture(2);
        let album_id = album.album_id;
        let owner = album.owner_id;
        let track_ids = album.track_ids.clone();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_album(album));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let outcome = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                target_type: TargetType::Album,
                target_id: album_id,
                target_user_id: owner,
                cascading: Some(CascadingOptions {
                    remove_album: true,
                    remove_tracks: false,
                }),
                ..base_params(album_id, owner)
            },
        )
        .await
        .unwrap();

        assert!(outcome.cascaded_actions.is_empty());
        assert!(!test_deps.store.album_exists(album_id));
        for track_id in track_ids {
            assert!(test_deps.store.track_exists(track_id));
        }
    }

    #[tokio::test]
    async fn test_remove_album_false_is_log_only() {
        let album = album_fixture(2);
        let album_id = album.album_id;
        let owner = album.owner_id;
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_album(album));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let outcome = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                action_type: ActionType::UserWarned,
                target_type: TargetType::Album,
                target_id: album_id,
                target_user_id: owner,
                cascading: Some(CascadingOptions {
                    remove_album: false,
                    remove_tracks: false,
                }),
                ..base_params(album_id, owner)
            },
        )
        .await
        .unwrap();

        assert!(outcome.cascaded_actions.is_empty());
        assert!(test_deps.store.album_exists(album_id));
    }

    #[tokio::test]
    async fn test_ban_requires_admin() {
        let target = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_user(target));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let err = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                action_type: ActionType::UserBanned,
                target_type: TargetType::User,
                ..base_params(target, target)
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(
            test_deps
                .events
                .recorded_of_type(event_types::UNAUTHORIZED_ADMIN_ACTION_ATTEMPT)
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_suspension_creates_linked_restriction() {
        let target = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_user(target));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let outcome = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                action_type: ActionType::UserSuspended,
                target_type: TargetType::User,
                ..base_params(target, target)
            },
        )
        .await
        .unwrap();

        let restriction = deps
            .store
            .find_restriction_by_action(outcome.action.id)
            .await
            .unwrap()
            .unwrap();
        assert!(restriction.active);
        assert_eq!(restriction.user_id, target);
    }

    #[tokio::test]
    async fn test_action_resolves_originating_report() {
        let post_id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(
            InMemoryStore::new().with_post(post_id).with_user(owner),
        );
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let report = crate::domains::reports::actions::submit_report(
            &deps,
            AuthUser::new(Uuid::new_v4()),
            crate::domains::reports::actions::SubmitReportParams {
                target_type: TargetType::Post,
                target_id: post_id,
                reason: crate::domains::reports::models::ReportReason::Spam,
                description: None,
            },
        )
        .await
        .unwrap();

        let outcome = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                report_id: Some(report.id),
                ..base_params(post_id, owner)
            },
        )
        .await
        .unwrap();

        let resolved = outcome.resolved_report.unwrap();
        assert_eq!(
            resolved.status,
            crate::domains::reports::models::ReportStatus::Resolved
        );
        assert_eq!(resolved.resolved_by, Some(moderator.user_id));
    }

    #[tokio::test]
    async fn test_unknown_report_id_is_not_found() {
        let post_id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(
            InMemoryStore::new().with_post(post_id).with_user(owner),
        );
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let err = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                report_id: Some(Uuid::new_v4()),
                ..base_params(post_id, owner)
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "NOT_FOUND");
        // Nothing was recorded and the content is untouched.
        assert!(deps
            .store
            .actions_targeting(owner, true)
            .await
            .unwrap()
            .is_empty());
        assert!(deps
            .store
            .target_exists(TargetType::Post, post_id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_reason_rejected() {
        let post_id = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_post(post_id));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let err = take_moderation_action(
            &deps,
            moderator,
            ModerationActionParams {
                reason: "  ".to_string(),
                ..base_params(post_id, Uuid::new_v4())
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
