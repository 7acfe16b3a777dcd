use crate::domains::reports::models::ReportReason;

/// Map a report reason to its queue priority. Lower is more urgent.
///
/// Self-harm always outranks everything else; hate speech and harassment
/// come next, then the general content categories, with `other` last.
pub fn calculate_priority(reason: ReportReason) -> i32 {
    match reason {
        ReportReason::SelfHarm => 1,
        ReportReason::HateSpeech | ReportReason::Harassment => 2,
        ReportReason::InappropriateContent
        | ReportReason::Spam
        | ReportReason::CopyrightViolation
        | ReportReason::Impersonation => 3,
        ReportReason::Other => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_harm_is_highest_priority() {
        assert_eq!(calculate_priority(ReportReason::SelfHarm), 1);
    }

    #[test]
    fn test_priority_mapping_is_exhaustive() {
        assert_eq!(calculate_priority(ReportReason::HateSpeech), 2);
        assert_eq!(calculate_priority(ReportReason::Harassment), 2);
        assert_eq!(calculate_priority(ReportReason::InappropriateContent), 3);
        assert_eq!(calculate_priority(ReportReason::Spam), 3);
        assert_eq!(calculate_priority(ReportReason::CopyrightViolation), 3);
        assert_eq!(calculate_priority(ReportReason::Impersonation), 3);
        assert_eq!(calculate_priority(ReportReason::Other), 4);
    }
}
