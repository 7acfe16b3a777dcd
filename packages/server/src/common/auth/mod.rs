/// Identity and role vocabulary for the moderation pipeline.
///
/// The current user is resolved once at the HTTP boundary and passed
/// explicitly through every action and guard call; nothing in the domain
/// layer re-resolves ambient identity. Role membership always comes from
/// the role store, never from the token.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated caller identity, threaded explicitly through the call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Platform roles, ordered by privilege.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
    juniper::GraphQLEnum,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}
