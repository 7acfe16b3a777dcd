//! GraphQL schema definition.

use chrono::{DateTime, Utc};
use juniper::{graphql_value, EmptySubscription, FieldError, FieldResult, RootNode};
use uuid::Uuid;

use super::context::GraphQLContext;
use crate::common::ModerationError;
use crate::domains::analytics;
use crate::domains::moderation::actions as moderation_actions;
use crate::domains::moderation::actions::{
    CascadingOptions, ImmutabilityReport, ModerationActionParams, ModificationAttempt,
    ReversalPatch, SuspiciousPattern,
};
use crate::domains::moderation::data::{ActionOutcomeData, AlbumContextData, ModerationActionData};
use crate::domains::moderation::models::{ActionType, RestrictionKind, ReversalFilters};
use crate::domains::reports::actions as report_actions;
use crate::domains::reports::actions::{FlagContentParams, SubmitReportParams};
use crate::domains::reports::data::ReportData;
use crate::domains::reports::models::{ReportReason, TargetType};

/// Convert a domain error into a FieldError carrying the machine-readable
/// code in extensions.
fn to_field_error(err: ModerationError) -> FieldError {
    let code = err.code();
    FieldError::new(err.to_string(), graphql_value!({ "code": code }))
}

#[derive(juniper::GraphQLInputObject)]
pub struct SubmitReportInput {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
}

#[derive(juniper::GraphQLInputObject)]
pub struct FlagContentInput {
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
}

#[derive(juniper::GraphQLInputObject)]
pub struct CascadingOptionsInput {
    pub remove_album: bool,
    pub remove_tracks: bool,
}

#[derive(juniper::GraphQLInputObject)]
pub struct TakeModerationActionInput {
    pub action_type: ActionType,
    pub target_type: TargetType,
    pub target_id: Uuid,
    pub target_user_id: Uuid,
    pub reason: String,
    pub internal_notes: Option<String>,
    pub report_id: Option<Uuid>,
    pub cascading: Option<CascadingOptionsInput>,
    pub restriction_kind: Option<RestrictionKind>,
    pub restriction_expires_at: Option<DateTime<Utc>>,
}

#[derive(juniper::GraphQLInputObject, Default)]
pub struct ReversalHistoryFilterInput {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub moderator_id: Option<Uuid>,
    pub action_type: Option<ActionType>,
    pub reversal_reason: Option<String>,
    pub target_user_id: Option<Uuid>,
    pub revoked_by: Option<Uuid>,
}

impl From<ReversalHistoryFilterInput> for ReversalFilters {
    fn from(input: ReversalHistoryFilterInput) -> Self {
        Self {
            start_date: input.start_date,
            end_date: input.end_date,
            moderator_id: input.moderator_id,
            action_type: input.action_type,
            reversal_reason: input.reversal_reason,
            target_user_id: input.target_user_id,
            revoked_by: input.revoked_by,
        }
    }
}

pub struct Query;

#[juniper::graphql_object(context = GraphQLContext)]
impl Query {
    /// Open reports: highest priority first, moderator flags ahead of user
    /// reports, then most recent.
    async fn moderation_queue(ctx: &GraphQLContext) -> FieldResult<Vec<ReportData>> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        let reports = report_actions::moderation_queue(&ctx.deps, actor)
            .await
            .map_err(to_field_error)?;
        Ok(reports.into_iter().map(Into::into).collect())
    }

    async fn fetch_album_context(
        ctx: &GraphQLContext,
        album_id: Uuid,
    ) -> FieldResult<AlbumContextData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::fetch_album_context(&ctx.deps, actor, album_id)
            .await
            .map(Into::into)
            .map_err(to_field_error)
    }

    async fn get_user_moderation_history(
        ctx: &GraphQLContext,
        user_id: Uuid,
        include_revoked: Option<bool>,
    ) -> FieldResult<Vec<ModerationActionData>> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        let actions = moderation_actions::get_user_moderation_history(
            &ctx.deps,
            actor,
            user_id,
            include_revoked.unwrap_or(false),
        )
        .await
        .map_err(to_field_error)?;
        Ok(actions.into_iter().map(Into::into).collect())
    }

    async fn get_reversal_history(
        ctx: &GraphQLContext,
        filters: Option<ReversalHistoryFilterInput>,
    ) -> FieldResult<Vec<ModerationActionData>> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        let actions = moderation_actions::get_reversal_history(
            &ctx.deps,
            actor,
            filters.unwrap_or_default().into(),
        )
        .await
        .map_err(to_field_error)?;
        Ok(actions.into_iter().map(Into::into).collect())
    }

    async fn calculate_reversal_rate(
        ctx: &GraphQLContext,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> FieldResult<analytics::ReversalRate> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        analytics::calculate_reversal_rate(&ctx.deps, actor, start, end)
            .await
            .map_err(to_field_error)
    }

    async fn get_moderator_reversal_stats(
        ctx: &GraphQLContext,
        moderator_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> FieldResult<analytics::ModeratorReversalStats> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        analytics::get_moderator_reversal_stats(&ctx.deps, actor, moderator_id, start, end)
            .await
            .map_err(to_field_error)
    }

    async fn get_reversal_metrics(
        ctx: &GraphQLContext,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> FieldResult<analytics::ReversalMetrics> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        analytics::get_reversal_metrics(&ctx.deps, actor, start, end)
            .await
            .map_err(to_field_error)
    }

    /// Whether a user accumulated 3+ moderation actions in the last 30 days.
    async fn detect_repeat_offender(ctx: &GraphQLContext, user_id: String) -> FieldResult<bool> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        analytics::detect_repeat_offender(&ctx.deps, actor, &user_id)
            .await
            .map_err(to_field_error)
    }

    /// 7/30/90-day violation buckets for a user. Null when no user id was
    /// supplied.
    async fn calculate_violation_timeline(
        ctx: &GraphQLContext,
        user_id: String,
    ) -> FieldResult<Option<analytics::ViolationTimeline>> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        analytics::calculate_violation_timeline(&ctx.deps, actor, &user_id)
            .await
            .map_err(to_field_error)
    }

    async fn verify_reversal_immutability(
        ctx: &GraphQLContext,
        action_id: Uuid,
    ) -> FieldResult<ImmutabilityReport> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::verify_reversal_immutability(&ctx.deps, actor, action_id)
            .await
            .map_err(to_field_error)
    }

    async fn detect_suspicious_reversal_activity(
        ctx: &GraphQLContext,
        user_id: Option<Uuid>,
        window_hours: Option<i32>,
    ) -> FieldResult<Vec<SuspiciousPattern>> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::detect_suspicious_reversal_activity(
            &ctx.deps,
            actor,
            user_id,
            window_hours,
        )
        .await
        .map_err(to_field_error)
    }
}

pub struct Mutation;

#[juniper::graphql_object(context = GraphQLContext)]
impl Mutation {
    async fn submit_report(
        ctx: &GraphQLContext,
        input: SubmitReportInput,
    ) -> FieldResult<ReportData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        report_actions::submit_report(
            &ctx.deps,
            actor,
            SubmitReportParams {
                target_type: input.target_type,
                target_id: input.target_id,
                reason: input.reason,
                description: input.description,
            },
        )
        .await
        .map(Into::into)
        .map_err(to_field_error)
    }

    async fn moderator_flag_content(
        ctx: &GraphQLContext,
        input: FlagContentInput,
    ) -> FieldResult<ReportData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        report_actions::moderator_flag_content(
            &ctx.deps,
            actor,
            FlagContentParams {
                target_type: input.target_type,
                target_id: input.target_id,
                reason: input.reason,
                description: input.description,
            },
        )
        .await
        .map(Into::into)
        .map_err(to_field_error)
    }

    async fn take_moderation_action(
        ctx: &GraphQLContext,
        input: TakeModerationActionInput,
    ) -> FieldResult<ActionOutcomeData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::take_moderation_action(
            &ctx.deps,
            actor,
            ModerationActionParams {
                action_type: input.action_type,
                target_type: input.target_type,
                target_id: input.target_id,
                target_user_id: input.target_user_id,
                reason: input.reason,
                internal_notes: input.internal_notes,
                report_id: input.report_id,
                cascading: input.cascading.map(|c| CascadingOptions {
                    remove_album: c.remove_album,
                    remove_tracks: c.remove_tracks,
                }),
                restriction_kind: input.restriction_kind,
                restriction_expires_at: input.restriction_expires_at,
            },
        )
        .await
        .map(Into::into)
        .map_err(to_field_error)
    }

    async fn revoke_action(
        ctx: &GraphQLContext,
        action_id: Uuid,
        reason: String,
    ) -> FieldResult<ModerationActionData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::revoke_action(&ctx.deps, actor, action_id, reason)
            .await
            .map(Into::into)
            .map_err(to_field_error)
    }

    async fn lift_suspension(
        ctx: &GraphQLContext,
        action_id: Uuid,
        reason: String,
    ) -> FieldResult<ModerationActionData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::lift_suspension(&ctx.deps, actor, action_id, reason)
            .await
            .map(Into::into)
            .map_err(to_field_error)
    }

    async fn remove_ban(
        ctx: &GraphQLContext,
        action_id: Uuid,
        reason: String,
    ) -> FieldResult<ModerationActionData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::remove_ban(&ctx.deps, actor, action_id, reason)
            .await
            .map(Into::into)
            .map_err(to_field_error)
    }

    async fn remove_user_restriction(
        ctx: &GraphQLContext,
        action_id: Uuid,
        reason: String,
    ) -> FieldResult<ModerationActionData> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::remove_user_restriction(&ctx.deps, actor, action_id, reason)
            .await
            .map(Into::into)
            .map_err(to_field_error)
    }

    /// Diagnostic mutation that exercises the revocation guard. Expected
    /// result is always `prevented: true`.
    async fn attempt_reversal_modification(
        ctx: &GraphQLContext,
        action_id: Uuid,
        patch: ReversalPatch,
    ) -> FieldResult<ModificationAttempt> {
        let actor = ctx.require_user().map_err(to_field_error)?;
        moderation_actions::attempt_reversal_modification(&ctx.deps, actor, action_id, patch)
            .await
            .map_err(to_field_error)
    }
}

pub type Schema = RootNode<'static, Query, Mutation, EmptySubscription<GraphQLContext>>;

pub fn create_schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_carries_code_extension() {
        let err = to_field_error(ModerationError::Unauthorized("no role".into()));
        let rendered = format!("{err:?}");
        assert!(rendered.contains("unauthorized"));
        assert!(rendered.contains("UNAUTHORIZED"));
    }

    #[test]
    fn test_schema_builds() {
        let _ = create_schema();
    }
}
