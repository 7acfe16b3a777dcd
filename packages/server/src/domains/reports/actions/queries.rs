use crate::common::{AuthUser, ModerationError};
use crate::domains::moderation::guards::Guard;
use crate::domains::reports::models::Report;
use crate::kernel::deps::ModerationDeps;

/// The open moderation queue, moderator-only. Ordering comes from the store:
/// priority first, moderator flags ahead of user reports, then recency.
pub async fn moderation_queue(
    deps: &ModerationDeps,
    actor: AuthUser,
) -> Result<Vec<Report>, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("moderation_queue")
        .await?;
    Ok(deps.store.open_reports().await?)
}
