//! Identity resolution for rule evaluation.
//!
//! This crate answers one question for the predicate engine: which groups is
//! an account effectively a member of?
//!
//! # Core Concepts
//!
//! ## GroupDirectory
//!
//! The [`GroupDirectory`] trait is the boundary to whatever system owns
//! accounts and groups. Lookups may be slow or remote and can fail with a
//! [`ResolutionError`].
//!
//! ## Directory
//!
//! [`Directory`] is an in-memory record store of [`Account`]s and [`Group`]s
//! keyed by primary key. It can be loaded from a TOML file and implements
//! [`GroupDirectory`], closing direct memberships over group inclusion.
//!
//! ## ResolverSession
//!
//! A [`ResolverSession`] wraps a directory for the duration of one
//! evaluation batch. It memoizes lookups so that a rule tree touching the
//! same account many times costs one directory call, and it can bound each
//! call with a timeout. Its cache dies with the session.
//!
//! # Example
//!
//! ```
//! use identity::{Account, AccountId, Directory, GroupId, ResolverSession};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let devs = GroupId::parse("devs")?;
//! let directory = Directory::new()
//!     .with_account(Account::new(AccountId(1000)).with_group(devs.clone()));
//!
//! let session = ResolverSession::new(directory);
//! assert!(session.is_member(AccountId(1000), &devs).await?);
//! # Ok(())
//! # }
//! ```

mod account;
mod directory;
mod error;
mod ids;
mod resolver;

pub use account::{Account, AccountSshKey, SshKeyId};
pub use directory::{Directory, Group, GroupDirectory};
pub use error::{Error, ResolutionError, Result};
pub use ids::{ANONYMOUS_USERS, AccountId, GroupId, GroupSet, MAX_GROUP_ID_LEN, REGISTERED_USERS};
pub use resolver::{ResolverConfig, ResolverSession, SessionId, SessionStats};
