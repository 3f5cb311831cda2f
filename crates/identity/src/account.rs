//! Account records and their SSH keys.

use crate::{AccountId, GroupId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary key of an SSH key: the owning account plus a per-account sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SshKeyId {
    pub account: AccountId,
    pub seq: u32,
}

/// An SSH public key registered for an account.
///
/// The key text is stored as entered (`<algorithm> <body> <comment>`) and
/// split on demand. Missing parts yield fixed defaults rather than errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSshKey {
    pub id: SshKeyId,
    pub public_key: String,
    pub stored_on: DateTime<Utc>,
    pub valid: bool,
}

impl AccountSshKey {
    pub fn new(id: SshKeyId, public_key: impl Into<String>) -> Self {
        Self {
            id,
            public_key: public_key.into(),
            stored_on: Utc::now(),
            valid: true,
        }
    }

    /// Key algorithm, or `"none"` when the key text is empty.
    pub fn algorithm(&self) -> &str {
        self.part(0).unwrap_or("none")
    }

    /// Base64 key body, if present.
    pub fn encoded_key(&self) -> Option<&str> {
        self.part(1)
    }

    /// Trailing comment, or `""` when absent.
    pub fn comment(&self) -> &str {
        self.part(2).unwrap_or("")
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    fn part(&self, index: usize) -> Option<&str> {
        self.public_key.split_whitespace().nth(index)
    }
}

/// A record in the account store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub full_name: Option<String>,
    pub active: bool,
    /// Groups the account is a direct member of.
    pub groups: Vec<GroupId>,
    pub ssh_keys: Vec<AccountSshKey>,
}

impl Account {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            full_name: None,
            active: true,
            groups: Vec::new(),
            ssh_keys: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_group(mut self, group: GroupId) -> Self {
        self.groups.push(group);
        self
    }

    /// Register an SSH key under the next free sequence number.
    pub fn with_ssh_key(mut self, public_key: impl Into<String>) -> Self {
        let seq = self.ssh_keys.iter().map(|k| k.id.seq).max().unwrap_or(0) + 1;
        let id = SshKeyId {
            account: self.id,
            seq,
        };
        self.ssh_keys.push(AccountSshKey::new(id, public_key));
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(text: &str) -> AccountSshKey {
        AccountSshKey::new(
            SshKeyId {
                account: AccountId(1),
                seq: 1,
            },
            text,
        )
    }

    #[test]
    fn test_full_key_splits_into_parts() {
        let k = key("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 alice@laptop");
        assert_eq!(k.algorithm(), "ssh-ed25519");
        assert_eq!(k.encoded_key(), Some("AAAAC3NzaC1lZDI1NTE5"));
        assert_eq!(k.comment(), "alice@laptop");
    }

    #[test]
    fn test_missing_parts_use_defaults() {
        let empty = key("");
        assert_eq!(empty.algorithm(), "none");
        assert_eq!(empty.encoded_key(), None);
        assert_eq!(empty.comment(), "");

        let blank = key("   ");
        assert_eq!(blank.algorithm(), "none");

        let no_comment = key("ssh-rsa AAAAB3Nza");
        assert_eq!(no_comment.algorithm(), "ssh-rsa");
        assert_eq!(no_comment.encoded_key(), Some("AAAAB3Nza"));
        assert_eq!(no_comment.comment(), "");

        let alg_only = key("ssh-rsa");
        assert_eq!(alg_only.encoded_key(), None);
    }

    #[test]
    fn test_invalidate() {
        let mut k = key("ssh-rsa AAAA");
        assert!(k.valid);
        k.invalidate();
        assert!(!k.valid);
    }

    #[test]
    fn test_ssh_key_sequence_numbers() {
        let account = Account::new(AccountId(7))
            .with_ssh_key("ssh-rsa A")
            .with_ssh_key("ssh-rsa B");
        let seqs: Vec<_> = account.ssh_keys.iter().map(|k| k.id.seq).collect();
        assert_eq!(seqs, [1, 2]);
        assert!(account.ssh_keys.iter().all(|k| k.id.account == AccountId(7)));
    }
}
