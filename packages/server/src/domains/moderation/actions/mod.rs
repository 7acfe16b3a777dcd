pub mod immutability;
pub mod queries;
pub mod revoke_action;
pub mod take_action;

pub use immutability::{
    attempt_reversal_modification, detect_suspicious_reversal_activity,
    verify_reversal_immutability, ImmutabilityReport, ModificationAttempt, PatternSeverity,
    ReversalPatch, SuspiciousPattern,
};
pub use queries::{fetch_album_context, get_reversal_history, get_user_moderation_history};
pub use revoke_action::{lift_suspension, remove_ban, remove_user_restriction, revoke_action};
pub use take_action::{take_moderation_action, ActionOutcome, CascadingOptions, ModerationActionParams};
