//! Analytics domain - offender detection and reversal metrics

pub mod detection;
pub mod metrics;

pub use detection::{calculate_violation_timeline, detect_repeat_offender, ViolationTimeline};
pub use metrics::{
    calculate_reversal_rate, get_moderator_reversal_stats, get_reversal_metrics,
    ActionTypeReversalRate, ModeratorReversalStats, ReversalMetrics, ReversalRate, SeverityClass,
    SeverityReversalRate, TimeToReversalStats,
};
