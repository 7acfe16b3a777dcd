use thiserror::Error;

/// Error taxonomy for the moderation pipeline.
///
/// Every public operation raises one of these variants. `code()` gives the
/// machine-checkable error code so callers can branch without parsing the
/// human-readable message.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// Malformed id/enum/date or a business-rule violation (e.g. double reversal)
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller is missing a required role
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller's role is sufficient but the target is protected
    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    /// Missing report/action/album/target
    #[error("not found: {0}")]
    NotFound(String),

    /// Persistence failure or unexpected exception, with underlying context
    #[error("database error: {0}")]
    Database(#[source] anyhow::Error),
}

impl ModerationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InsufficientPermissions(_) => "INSUFFICIENT_PERMISSIONS",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Wrap an unexpected failure without leaking internals into the taxonomy.
    pub fn unexpected(err: impl Into<anyhow::Error>) -> Self {
        Self::Database(err.into().context("unexpected error"))
    }
}

impl From<anyhow::Error> for ModerationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err)
    }
}

impl From<sqlx::Error> for ModerationError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            other => Self::Database(anyhow::Error::new(other)),
        }
    }
}
