//! Reports domain - report intake, prioritization, and the moderation queue

pub mod actions;
pub mod data;
pub mod models;
pub mod priority;
