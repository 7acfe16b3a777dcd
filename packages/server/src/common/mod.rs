pub mod auth;
pub mod errors;

pub use auth::{AuthUser, Role};
pub use errors::ModerationError;
