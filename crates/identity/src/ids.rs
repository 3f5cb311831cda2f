//! Principal and group identifiers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum length of a group UUID, in bytes.
pub const MAX_GROUP_ID_LEN: usize = 255;

/// UUID of the group every account belongs to, signed in or not.
pub const ANONYMOUS_USERS: &str = "global:Anonymous-Users";

/// UUID of the group every known account belongs to.
pub const REGISTERED_USERS: &str = "global:Registered-Users";

/// Stable identifier of an account (an uploader or an approver).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u32);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Opaque group UUID.
///
/// Only constructed through [`GroupId::parse`], so a `GroupId` in hand is
/// always well formed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    /// Validate and wrap a group UUID.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("must not be empty")
        } else if id.len() > MAX_GROUP_ID_LEN {
            Some("longer than 255 bytes")
        } else if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            Some("contains whitespace or control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidGroupId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn anonymous_users() -> Self {
        Self(ANONYMOUS_USERS.to_string())
    }

    pub fn registered_users() -> Self {
        Self(REGISTERED_USERS.to_string())
    }

    /// Whether this is one of the groups every account is implicitly in.
    pub fn is_system(&self) -> bool {
        self.0 == ANONYMOUS_USERS || self.0 == REGISTERED_USERS
    }
}

impl TryFrom<String> for GroupId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<GroupId> for String {
    fn from(id: GroupId) -> Self {
        id.0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The effective groups of one account, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSet(BTreeSet<GroupId>);

impl GroupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, group: &GroupId) -> bool {
        self.0.contains(group)
    }

    /// Add a group, returning `false` if it was already present.
    pub fn insert(&mut self, group: GroupId) -> bool {
        self.0.insert(group)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupId> {
        self.0.iter()
    }
}

impl FromIterator<GroupId> for GroupSet {
    fn from_iter<I: IntoIterator<Item = GroupId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for GroupSet {
    type Item = GroupId;
    type IntoIter = std::collections::btree_set::IntoIter<GroupId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
