//! Moderation domain - action application, cascades, reversal, and the
//! tamper-evidence machinery around reversal records

pub mod actions;
pub mod data;
pub mod guards;
pub mod models;
