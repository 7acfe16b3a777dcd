//! Domain modules - business logic organized by domain

pub mod analytics;
pub mod auth;
pub mod moderation;
pub mod reports;
