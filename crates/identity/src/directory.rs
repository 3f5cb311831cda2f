//! Group directory: the collaborator that knows who is in which group.

use crate::account::{Account, AccountSshKey, SshKeyId};
use crate::{AccountId, Error, GroupId, GroupSet, ResolutionError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Source of effective group memberships.
///
/// Implementations may be slow or remote. Callers normally go through a
/// [`ResolverSession`](crate::ResolverSession), which memoizes lookups and
/// bounds their latency.
pub trait GroupDirectory: Send + Sync {
    /// Resolve every group the account is effectively a member of.
    fn effective_groups(
        &self,
        account: AccountId,
    ) -> impl Future<Output = std::result::Result<GroupSet, ResolutionError>> + Send;
}

impl<D: GroupDirectory> GroupDirectory for Arc<D> {
    fn effective_groups(
        &self,
        account: AccountId,
    ) -> impl Future<Output = std::result::Result<GroupSet, ResolutionError>> + Send {
        (**self).effective_groups(account)
    }
}

/// A group record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub uuid: GroupId,
    pub name: Option<String>,
    /// Groups whose members are also members of this group.
    pub includes: Vec<GroupId>,
}

impl Group {
    pub fn new(uuid: GroupId) -> Self {
        Self {
            uuid,
            name: None,
            includes: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn including(mut self, member_group: GroupId) -> Self {
        self.includes.push(member_group);
        self
    }
}

/// In-memory account and group store, keyed by primary key.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    accounts: BTreeMap<AccountId, Account>,
    groups: BTreeMap<GroupId, Group>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a directory from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a directory from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let file: DirectoryFile = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        file.into_directory()
    }

    /// Insert or replace an account record.
    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.insert(account.id, account);
        self
    }

    /// Insert or replace a group record.
    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.insert(group.uuid.clone(), group);
        self
    }

    pub fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn group(&self, uuid: &GroupId) -> Option<&Group> {
        self.groups.get(uuid)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Compute effective groups synchronously.
    ///
    /// Direct memberships are closed over group inclusion: if group A
    /// includes group B, members of B are members of A. Every known active
    /// account is also in the system groups.
    pub fn resolve(&self, id: AccountId) -> std::result::Result<GroupSet, ResolutionError> {
        let account = self
            .accounts
            .get(&id)
            .filter(|a| a.active)
            .ok_or(ResolutionError::UnknownAccount(id))?;

        let mut seen: HashSet<&GroupId> = HashSet::new();
        let mut queue: VecDeque<&GroupId> = account.groups.iter().collect();
        while let Some(group) = queue.pop_front() {
            if !seen.insert(group) {
                continue;
            }
            for parent in self.groups.values() {
                if parent.includes.contains(group) {
                    queue.push_back(&parent.uuid);
                }
            }
        }

        let mut groups: GroupSet = seen.into_iter().cloned().collect();
        groups.insert(GroupId::anonymous_users());
        groups.insert(GroupId::registered_users());
        Ok(groups)
    }
}

impl GroupDirectory for Directory {
    async fn effective_groups(
        &self,
        account: AccountId,
    ) -> std::result::Result<GroupSet, ResolutionError> {
        self.resolve(account)
    }
}

#[derive(Debug, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    accounts: Vec<AccountRecord>,
    #[serde(default)]
    groups: Vec<GroupRecord>,
}

#[derive(Debug, Deserialize)]
struct AccountRecord {
    id: AccountId,
    full_name: Option<String>,
    #[serde(default = "default_true")]
    active: bool,
    #[serde(default)]
    groups: Vec<GroupId>,
    #[serde(default)]
    ssh_keys: Vec<SshKeyRecord>,
}

#[derive(Debug, Deserialize)]
struct SshKeyRecord {
    key: String,
    #[serde(default = "default_true")]
    valid: bool,
    stored_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    uuid: GroupId,
    name: Option<String>,
    #[serde(default)]
    includes: Vec<GroupId>,
}

fn default_true() -> bool {
    true
}

impl DirectoryFile {
    fn into_directory(self) -> Result<Directory> {
        let mut directory = Directory::new();

        for record in self.accounts {
            if directory.accounts.contains_key(&record.id) {
                return Err(Error::Parse(format!("duplicate account {}", record.id)));
            }
            let ssh_keys = record
                .ssh_keys
                .into_iter()
                .zip(1..)
                .map(|(key, seq)| AccountSshKey {
                    id: SshKeyId {
                        account: record.id,
                        seq,
                    },
                    public_key: key.key,
                    stored_on: key.stored_on.unwrap_or_else(Utc::now),
                    valid: key.valid,
                })
                .collect();
            directory = directory.with_account(Account {
                id: record.id,
                full_name: record.full_name,
                active: record.active,
                groups: record.groups,
                ssh_keys,
            });
        }

        for record in self.groups {
            if directory.groups.contains_key(&record.uuid) {
                return Err(Error::Parse(format!("duplicate group {}", record.uuid)));
            }
            directory = directory.with_group(Group {
                uuid: record.uuid,
                name: record.name,
                includes: record.includes,
            });
        }

        Ok(directory)
    }
}
