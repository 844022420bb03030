use thiserror::Error;

/// Domain errors surfaced to route handlers. Anything not covered by a
/// specific kind travels as `Internal` and becomes a 500.
#[derive(Debug, Error)]
pub enum Error {
    #[error("username or email is already taken")]
    DuplicateIdentity,
    #[error("validation failed: {0}")]
    ValidationFailure(&'static str),
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
