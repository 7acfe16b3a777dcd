//! Moderator-facing queries over actions and the content catalog

use uuid::Uuid;

use crate::common::{AuthUser, ModerationError};
use crate::domains::moderation::guards::Guard;
use crate::domains::moderation::models::{ModerationAction, ReversalFilters};
use crate::kernel::deps::ModerationDeps;
use crate::kernel::traits::AlbumContext;

/// An album with its owner and track ids, as the cascade executor sees it.
pub async fn fetch_album_context(
    deps: &ModerationDeps,
    actor: AuthUser,
    album_id: Uuid,
) -> Result<AlbumContext, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("fetch_album_context")
        .await?;
    deps.store
        .find_album(album_id)
        .await?
        .ok_or_else(|| ModerationError::NotFound(format!("album {album_id} does not exist")))
}

/// Actions taken against one user, newest first. Revoked actions are only
/// included on request.
pub async fn get_user_moderation_history(
    deps: &ModerationDeps,
    actor: AuthUser,
    user_id: Uuid,
    include_revoked: bool,
) -> Result<Vec<ModerationAction>, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("get_user_moderation_history")
        .await?;
    Ok(deps.store.actions_targeting(user_id, include_revoked).await?)
}

/// Reversed actions matching the given filters, most recent reversal first.
pub async fn get_reversal_history(
    deps: &ModerationDeps,
    actor: AuthUser,
    filters: ReversalFilters,
) -> Result<Vec<ModerationAction>, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("get_reversal_history")
        .await?;
    Ok(deps.store.revoked_actions(filters).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Role;
    use crate::domains::moderation::actions::revoke_action::revoke_action;
    use crate::domains::moderation::actions::take_action::{
        take_moderation_action, ModerationActionParams,
    };
    use crate::domains::moderation::models::ActionType;
    use crate::domains::reports::models::TargetType;
    use crate::kernel::test_dependencies::{InMemoryStore, TestDependencies};
    use crate::kernel::traits::AlbumContext;

    #[tokio::test]
    async fn test_album_context_round_trip() {
        let album = AlbumContext {
            album_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Night Drive".to_string(),
            track_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        let test_deps =
            TestDependencies::with_store(InMemoryStore::new().with_album(album.clone()));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let fetched = fetch_album_context(&deps, moderator, album.album_id)
            .await
            .unwrap();
        assert_eq!(fetched, album);

        let err = fetch_album_context(&deps, moderator, Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_history_hides_revoked_unless_requested() {
        let target = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_user(target));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        let mut action_ids = Vec::new();
        for _ in 0..2 {
            let outcome = take_moderation_action(
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
            .unwrap();
            action_ids.push(outcome.action.id);
        }
        revoke_action(&deps, moderator, action_ids[0], "mistake".into())
            .await
            .unwrap();

        let active = get_user_moderation_history(&deps, moderator, target, false)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, action_ids[1]);

        let all = get_user_moderation_history(&deps, moderator, target, true)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_reversal_history_filters_by_reason() {
        let target = Uuid::new_v4();
        let test_deps = TestDependencies::with_store(InMemoryStore::new().with_user(target));
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        let deps = test_deps.deps();

        for reason in ["appeal upheld", "entered in error"] {
            let outcome = take_moderation_action(
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
            .unwrap();
            revoke_action(&deps, moderator, outcome.action.id, reason.into())
                .await
                .unwrap();
        }

        let matched = get_reversal_history(
            &deps,
            moderator,
            ReversalFilters {
                reversal_reason: Some("appeal upheld".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(
            matched[0].metadata.reversal.as_ref().unwrap().reversal_reason,
            "appeal upheld"
        );
    }
}
