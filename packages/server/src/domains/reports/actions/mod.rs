pub mod flag_content;
pub mod queries;
pub mod submit_report;

pub use flag_content::{moderator_flag_content, FlagContentParams};
pub use queries::moderation_queue;
pub use submit_report::{
    submit_report, SubmitReportParams, REPORT_RATE_LIMIT, REPORT_RATE_WINDOW_MS,
};
