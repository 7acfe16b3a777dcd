//! Authorization guards shared by every moderation entry point.
//!
//! Each denial writes exactly one security event before the error propagates.
//! Event recording is best-effort: a sink failure is logged and never masks
//! the authorization error the caller is owed.

use serde_json::json;
use tracing::error;
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError, Role};
use crate::domains::moderation::models::ModerationAction;
use crate::kernel::deps::ModerationDeps;
use crate::kernel::traits::{event_types, SecurityEvent};

pub struct Guard<'a> {
    deps: &'a ModerationDeps,
    actor: AuthUser,
}

impl<'a> Guard<'a> {
    pub fn new(deps: &'a ModerationDeps, actor: AuthUser) -> Self {
        Self { deps, actor }
    }

    /// Append a security event, logging (not propagating) sink failures.
    pub async fn record_event(&self, event_type: &str, details: serde_json::Value) {
        let event = SecurityEvent::now(event_type, Some(self.actor.user_id), details);
        if let Err(err) = self.deps.security_events.record(event).await {
            error!(%err, event_type, "failed to record security event");
        }
    }

    pub async fn is_admin(&self) -> Result<bool, ModerationError> {
        Ok(self.deps.roles.has_role(self.actor.user_id, Role::Admin).await?)
    }

    /// Whether the actor is undoing their own action. Self-reversal is
    /// allowed; callers flag and log it instead of denying.
    pub fn is_self_reversal(&self, action: &ModerationAction) -> bool {
        action.moderator_id == self.actor.user_id
    }

    /// Require the moderator role (admins qualify). A denial writes one
    /// `unauthorized_moderation_attempt` event.
    pub async fn verify_moderator_role(&self, attempted: &str) -> Result<(), ModerationError> {
        let is_moderator = self
            .deps
            .roles
            .has_role(self.actor.user_id, Role::Moderator)
            .await?;
        if is_moderator || self.is_admin().await? {
            return Ok(());
        }
        self.record_event(
            event_types::UNAUTHORIZED_MODERATION_ATTEMPT,
            json!({ "attempted": attempted }),
        )
        .await;
        Err(ModerationError::Unauthorized(
            "moderator role required".to_string(),
        ))
    }

    /// Require the admin role. The denial event type is caller-supplied so
    /// ban revocation can be told apart from other admin-only operations.
    pub async fn verify_admin_role(
        &self,
        denial_event: &str,
        attempted: &str,
    ) -> Result<(), ModerationError> {
        if self.is_admin().await? {
            return Ok(());
        }
        self.record_event(denial_event, json!({ "attempted": attempted }))
            .await;
        Err(ModerationError::Unauthorized(
            "admin role required".to_string(),
        ))
    }

    /// Reject non-admin actors operating on an admin-held account. Admins may
    /// act on other admins; everyone else gets a denial plus one
    /// `unauthorized_action_on_admin_target` event.
    pub async fn verify_not_admin_target(
        &self,
        target_user_id: Uuid,
        attempted_action: &str,
    ) -> Result<(), ModerationError> {
        let target_is_admin = self.deps.roles.has_role(target_user_id, Role::Admin).await?;
        if !target_is_admin || self.is_admin().await? {
            return Ok(());
        }
        self.record_event(
            event_types::UNAUTHORIZED_ACTION_ON_ADMIN_TARGET,
            json!({
                "targetUserId": target_user_id,
                "attemptedAction": attempted_action,
            }),
        )
        .await;
        Err(ModerationError::InsufficientPermissions(
            "cannot take moderation action against an administrator".to_string(),
        ))
    }
}
