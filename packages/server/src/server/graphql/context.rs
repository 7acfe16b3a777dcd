use crate::common::{AuthUser, ModerationError};
use crate::kernel::deps::ModerationDeps;

/// GraphQL request context
///
/// Shared collaborators plus the per-request caller identity. The identity is
/// resolved once by the JWT middleware and injected here; resolvers pass it
/// explicitly into every domain action.
#[derive(Clone)]
pub struct GraphQLContext {
    pub deps: ModerationDeps,
    pub auth_user: Option<AuthUser>,
}

impl juniper::Context for GraphQLContext {}

impl GraphQLContext {
    pub fn new(deps: ModerationDeps, auth_user: Option<AuthUser>) -> Self {
        Self { deps, auth_user }
    }

    /// The authenticated caller, or UNAUTHORIZED when the request carried no
    /// valid token.
    pub fn require_user(&self) -> Result<AuthUser, ModerationError> {
        self.auth_user
            .ok_or_else(|| ModerationError::Unauthorized("authentication required".to_string()))
    }
}
