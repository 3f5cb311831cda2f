//! Predicate error types.

use identity::ResolutionError;
use thiserror::Error;

/// Errors from building, rewriting or evaluating predicates.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed construction parameters, or a `copy` with the wrong arity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A leaf needed a context field that is not set.
    #[error("invalid context: {0}")]
    InvalidContext(String),

    /// Group membership could not be determined.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The caller cancelled evaluation.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl Error {
    /// Whether the result is indeterminate because of the identity directory.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Error::Resolution(_))
    }
}

impl From<identity::Error> for Error {
    fn from(err: identity::Error) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
