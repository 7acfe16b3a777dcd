pub mod report;

pub use report::{NewReport, Report, ReportReason, ReportStatus, TargetType};
