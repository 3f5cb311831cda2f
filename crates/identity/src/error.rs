//! Identity error types.

use crate::AccountId;
use std::time::Duration;
use thiserror::Error;

/// Failure to resolve the groups of a principal.
///
/// Callers must treat every variant as "indeterminate", never as
/// "not a member".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ResolutionError {
    /// The directory has no (active) account with this id.
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),

    /// The backing directory could not be reached.
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    /// The lookup did not complete within the session timeout.
    #[error("group lookup for account {account} timed out after {after:?}")]
    Timeout { account: AccountId, after: Duration },
}

/// Errors raised while building or loading a directory.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A group identifier failed validation.
    #[error("invalid group id {id:?}: {reason}")]
    InvalidGroupId { id: String, reason: &'static str },

    /// Failed to parse a directory file.
    #[error("failed to parse directory: {0}")]
    Parse(String),

    /// An I/O error occurred while reading a directory file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
