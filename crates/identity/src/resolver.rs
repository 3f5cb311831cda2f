//! Session-scoped identity resolution.

use crate::{AccountId, GroupDirectory, GroupId, GroupSet, ResolutionError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Resolver settings, read from the `[resolver]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound for a single directory lookup, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ResolverConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Cache counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub hits: u64,
    pub misses: u64,
}

/// Unique identifier for an evaluation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Memoizing front for a [`GroupDirectory`], scoped to one evaluation batch.
///
/// Create one per batch and drop it afterwards; memberships are never
/// cached beyond the life of the session. A session may be shared across
/// tasks behind an `Arc`. Failed lookups are not cached.
pub struct ResolverSession<D> {
    id: SessionId,
    directory: D,
    timeout: Option<Duration>,
    cache: RwLock<HashMap<AccountId, Arc<GroupSet>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<D: GroupDirectory> ResolverSession<D> {
    pub fn new(directory: D) -> Self {
        Self {
            id: SessionId::new(),
            directory,
            timeout: None,
            cache: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(directory: D, config: &ResolverConfig) -> Self {
        let session = Self::new(directory);
        match config.timeout() {
            Some(timeout) => session.with_timeout(timeout),
            None => session,
        }
    }

    /// Bound every directory lookup. Expiry surfaces as
    /// [`ResolutionError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Effective groups of `account`, looked up at most once per session
    /// unless concurrent callers race on the first lookup.
    #[instrument(skip(self), fields(session = %self.id))]
    pub async fn effective_groups(
        &self,
        account: AccountId,
    ) -> Result<Arc<GroupSet>, ResolutionError> {
        if let Some(groups) = self.cache.read().await.get(&account) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("group cache hit");
            return Ok(Arc::clone(groups));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("group cache miss");

        let lookup = self.directory.effective_groups(account);
        let groups = match self.timeout {
            Some(after) => match tokio::time::timeout(after, lookup).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(?after, "group lookup timed out");
                    return Err(ResolutionError::Timeout { account, after });
                }
            },
            None => lookup.await?,
        };

        let groups = Arc::new(groups);
        let mut cache = self.cache.write().await;
        let stored = cache.entry(account).or_insert(groups);
        Ok(Arc::clone(stored))
    }

    /// Whether `account` is effectively a member of `group`.
    pub async fn is_member(
        &self,
        account: AccountId,
        group: &GroupId,
    ) -> Result<bool, ResolutionError> {
        Ok(self.effective_groups(account).await?.contains(group))
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
