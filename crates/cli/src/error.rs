//! CLI error types.

use identity::AccountId;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The account is not in the directory.
    #[error("no account {0} in directory")]
    AccountNotFound(AccountId),

    /// The rule file is not a valid predicate tree.
    #[error("invalid rule: {0}")]
    Rule(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Predicate(#[from] predicate::Error),

    #[error(transparent)]
    Identity(#[from] identity::Error),

    #[error(transparent)]
    Resolution(#[from] identity::ResolutionError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
