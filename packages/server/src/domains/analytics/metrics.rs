//! Reversal metrics - rates, breakdowns, and time-to-reversal statistics

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::{AuthUser, ModerationError};
use crate::domains::moderation::guards::Guard;
use crate::domains::moderation::models::{ActionType, ModerationAction};
use crate::kernel::deps::ModerationDeps;

/// Reversal rate over a set of actions. The rate is a percentage rounded to
/// two decimals; an empty set has rate 0 rather than NaN.
#[derive(Debug, Clone, PartialEq, juniper::GraphQLObject)]
pub struct ReversalRate {
    pub total_actions: i32,
    pub reversed_actions: i32,
    pub reversal_rate: f64,
}

#[derive(Debug, Clone, juniper::GraphQLObject)]
pub struct ModeratorReversalStats {
    pub moderator_id: Uuid,
    pub total_actions: i32,
    pub reversed_actions: i32,
    pub reversal_rate: f64,
}

/// Coarse severity classes for the per-severity breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, juniper::GraphQLEnum)]
pub enum SeverityClass {
    Low,
    Medium,
    High,
}

impl SeverityClass {
    fn of(action_type: ActionType) -> Self {
        match action_type {
            ActionType::UserBanned | ActionType::UserSuspended => Self::High,
            ActionType::RestrictionApplied | ActionType::ContentRemoved => Self::Medium,
            ActionType::UserWarned | ActionType::ContentApproved => Self::Low,
        }
    }
}

#[derive(Debug, Clone, juniper::GraphQLObject)]
pub struct ActionTypeReversalRate {
    pub action_type: ActionType,
    pub total_actions: i32,
    pub reversed_actions: i32,
    pub reversal_rate: f64,
}

#[derive(Debug, Clone, juniper::GraphQLObject)]
pub struct SeverityReversalRate {
    pub severity: SeverityClass,
    pub total_actions: i32,
    pub reversed_actions: i32,
    pub reversal_rate: f64,
}

/// Time from application to reversal, in hours, computed only over actions
/// that were actually reversed.
#[derive(Debug, Clone, PartialEq, juniper::GraphQLObject)]
pub struct TimeToReversalStats {
    pub mean_hours: f64,
    pub median_hours: f64,
    pub min_hours: f64,
    pub max_hours: f64,
}

#[derive(Debug, Clone, juniper::GraphQLObject)]
pub struct ReversalMetrics {
    pub overall: ReversalRate,
    pub by_action_type: Vec<ActionTypeReversalRate>,
    pub by_severity: Vec<SeverityReversalRate>,
    pub by_moderator: Vec<ModeratorReversalStats>,
    pub time_to_reversal: Option<TimeToReversalStats>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn rate_of(total: usize, reversed: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(reversed as f64 / total as f64 * 100.0)
    }
}

fn summarize(actions: &[ModerationAction]) -> ReversalRate {
    let total = actions.len();
    let reversed = actions.iter().filter(|a| a.is_revoked()).count();
    ReversalRate {
        total_actions: total as i32,
        reversed_actions: reversed as i32,
        reversal_rate: rate_of(total, reversed),
    }
}

/// Platform-wide reversal rate over an optional date range.
pub async fn calculate_reversal_rate(
    deps: &ModerationDeps,
    actor: AuthUser,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<ReversalRate, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("calculate_reversal_rate")
        .await?;
    let actions = deps.store.actions_in_range(start, end).await?;
    Ok(summarize(&actions))
}

/// One moderator's reversal rate over an optional date range.
pub async fn get_moderator_reversal_stats(
    deps: &ModerationDeps,
    actor: AuthUser,
    moderator_id: Uuid,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<ModeratorReversalStats, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("get_moderator_reversal_stats")
        .await?;
    let actions: Vec<ModerationAction> = deps
        .store
        .actions_in_range(start, end)
        .await?
        .into_iter()
        .filter(|a| a.moderator_id == moderator_id)
        .collect();
    let summary = summarize(&actions);
    Ok(ModeratorReversalStats {
        moderator_id,
        total_actions: summary.total_actions,
        reversed_actions: summary.reversed_actions,
        reversal_rate: summary.reversal_rate,
    })
}

/// Full reversal metrics: overall rate, breakdowns by action type, severity
/// class, and moderator, plus time-to-reversal statistics.
pub async fn get_reversal_metrics(
    deps: &ModerationDeps,
    actor: AuthUser,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<ReversalMetrics, ModerationError> {
    Guard::new(deps, actor)
        .verify_moderator_role("get_reversal_metrics")
        .await?;
    let actions = deps.store.actions_in_range(start, end).await?;

    let mut by_type: BTreeMap<&'static str, (ActionType, Vec<&ModerationAction>)> =
        BTreeMap::new();
    let mut by_severity: BTreeMap<SeverityClass, Vec<&ModerationAction>> = BTreeMap::new();
    let mut by_moderator: BTreeMap<Uuid, Vec<&ModerationAction>> = BTreeMap::new();
    for action in &actions {
        by_type
            .entry(action.action_type.as_str())
            .or_insert_with(|| (action.action_type, Vec::new()))
            .1
            .push(action);
        by_severity
            .entry(SeverityClass::of(action.action_type))
            .or_default()
            .push(action);
        by_moderator.entry(action.moderator_id).or_default().push(action);
    }

    let group_rate = |group: &[&ModerationAction]| {
        let reversed = group.iter().filter(|a| a.is_revoked()).count();
        (group.len(), reversed, rate_of(group.len(), reversed))
    };

    let by_action_type = by_type
        .into_values()
        .map(|(action_type, group)| {
            let (total, reversed, rate) = group_rate(&group);
            ActionTypeReversalRate {
                action_type,
                total_actions: total as i32,
                reversed_actions: reversed as i32,
                reversal_rate: rate,
            }
        })
        .collect();
    let by_severity = by_severity
        .into_iter()
        .map(|(severity, group)| {
            let (total, reversed, rate) = group_rate(&group);
            SeverityReversalRate {
                severity,
                total_actions: total as i32,
                reversed_actions: reversed as i32,
                reversal_rate: rate,
            }
        })
        .collect();
    let by_moderator = by_moderator
        .into_iter()
        .map(|(moderator_id, group)| {
            let (total, reversed, rate) = group_rate(&group);
            ModeratorReversalStats {
                moderator_id,
                total_actions: total as i32,
                reversed_actions: reversed as i32,
                reversal_rate: rate,
            }
        })
        .collect();

    Ok(ReversalMetrics {
        overall: summarize(&actions),
        by_action_type,
        by_severity,
        by_moderator,
        time_to_reversal: time_to_reversal(&actions),
    })
}

fn time_to_reversal(actions: &[ModerationAction]) -> Option<TimeToReversalStats> {
    let mut hours: Vec<f64> = actions
        .iter()
        .filter_map(|a| a.revoked_at.map(|revoked| (revoked - a.created_at)))
        .map(|d| d.num_milliseconds() as f64 / 3_600_000.0)
        .collect();
    if hours.is_empty() {
        return None;
    }
    hours.sort_by(|a, b| a.total_cmp(b));
    let n = hours.len();
    let median = if n % 2 == 1 {
        hours[n / 2]
    } else {
        (hours[n / 2 - 1] + hours[n / 2]) / 2.0
    };
    Some(TimeToReversalStats {
        mean_hours: round2(hours.iter().sum::<f64>() / n as f64),
        median_hours: round2(median),
        min_hours: round2(hours[0]),
        max_hours: round2(hours[n - 1]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Role;
    use crate::domains::moderation::models::ActionMetadata;
    use crate::domains::reports::models::TargetType;
    use crate::kernel::test_dependencies::TestDependencies;
    use chrono::Duration;
    use sqlx::types::Json;

    fn seeded_action(
        moderator_id: Uuid,
        action_type: ActionType,
        revoked_after_hours: Option<i64>,
    ) -> ModerationAction {
        let target = Uuid::new_v4();
        let created_at = Utc::now() - Duration::days(10);
        ModerationAction {
            id: Uuid::new_v4(),
            moderator_id,
            target_user_id: target,
            action_type,
            target_type: TargetType::User,
            target_id: target,
            reason: "reason".to_string(),
            internal_notes: None,
            metadata: Json(ActionMetadata::default()),
            notification_sent: false,
            created_at,
            revoked_at: revoked_after_hours.map(|h| created_at + Duration::hours(h)),
            revoked_by: revoked_after_hours.map(|_| Uuid::new_v4()),
        }
    }

    fn setup() -> (TestDependencies, AuthUser) {
        let test_deps = TestDependencies::new();
        let moderator = AuthUser::new(Uuid::new_v4());
        test_deps.roles.grant(moderator.user_id, Role::Moderator);
        (test_deps, moderator)
    }

    #[tokio::test]
    async fn test_rate_is_rounded_to_two_decimals() {
        let (test_deps, actor) = setup();
        let moderator = Uuid::new_v4();
        // 1 reversal out of 3 actions: 33.333...% rounds to 33.33.
        test_deps
            .store
            .seed_action(seeded_action(moderator, ActionType::UserWarned, Some(2)));
        test_deps
            .store
            .seed_action(seeded_action(moderator, ActionType::UserWarned, None));
        test_deps
            .store
            .seed_action(seeded_action(moderator, ActionType::UserWarned, None));
        let deps = test_deps.deps();

        let rate = calculate_reversal_rate(&deps, actor, None, None)
            .await
            .unwrap();
        assert_eq!(rate.total_actions, 3);
        assert_eq!(rate.reversed_actions, 1);
        assert_eq!(rate.reversal_rate, 33.33);
    }

    #[tokio::test]
    async fn test_empty_range_has_zero_rate() {
        let (test_deps, actor) = setup();
        let deps = test_deps.deps();

        let rate = calculate_reversal_rate(&deps, actor, None, None)
            .await
            .unwrap();
        assert_eq!(rate.total_actions, 0);
        assert_eq!(rate.reversal_rate, 0.0);
    }

    #[tokio::test]
    async fn test_moderator_stats_only_count_their_actions() {
        let (test_deps, actor) = setup();
        let moderator_a = Uuid::new_v4();
        let moderator_b = Uuid::new_v4();
        test_deps
            .store
            .seed_action(seeded_action(moderator_a, ActionType::UserWarned, Some(1)));
        test_deps
            .store
            .seed_action(seeded_action(moderator_a, ActionType::UserWarned, None));
        test_deps
            .store
            .seed_action(seeded_action(moderator_b, ActionType::UserWarned, None));
        let deps = test_deps.deps();

        let stats = get_moderator_reversal_stats(&deps, actor, moderator_a, None, None)
            .await
            .unwrap();
        assert_eq!(stats.total_actions, 2);
        assert_eq!(stats.reversed_actions, 1);
        assert_eq!(stats.reversal_rate, 50.0);
    }

    #[tokio::test]
    async fn test_metrics_breakdowns_and_time_to_reversal() {
        let (test_deps, actor) = setup();
        let moderator = Uuid::new_v4();
        test_deps
            .store
            .seed_action(seeded_action(moderator, ActionType::UserBanned, Some(2)));
        test_deps
            .store
            .seed_action(seeded_action(moderator, ActionType::UserWarned, Some(4)));
        test_deps
            .store
            .seed_action(seeded_action(moderator, ActionType::ContentRemoved, None));
        let deps = test_deps.deps();

        let metrics = get_reversal_metrics(&deps, actor, None, None).await.unwrap();
        assert_eq!(metrics.overall.total_actions, 3);
        assert_eq!(metrics.overall.reversed_actions, 2);
        assert_eq!(metrics.by_action_type.len(), 3);

        let high = metrics
            .by_severity
            .iter()
            .find(|s| s.severity == SeverityClass::High)
            .unwrap();
        assert_eq!(high.total_actions, 1);
        assert_eq!(high.reversal_rate, 100.0);

        let ttr = metrics.time_to_reversal.unwrap();
        assert_eq!(ttr.min_hours, 2.0);
        assert_eq!(ttr.max_hours, 4.0);
        assert_eq!(ttr.mean_hours, 3.0);
        assert_eq!(ttr.median_hours, 3.0);
    }

    #[tokio::test]
    async fn test_no_reversals_means_no_time_stats() {
        let (test_deps, actor) = setup();
        test_deps
            .store
            .seed_action(seeded_action(Uuid::new_v4(), ActionType::UserWarned, None));
        let deps = test_deps.deps();

        let metrics = get_reversal_metrics(&deps, actor, None, None).await.unwrap();
        assert!(metrics.time_to_reversal.is_none());
    }
}
