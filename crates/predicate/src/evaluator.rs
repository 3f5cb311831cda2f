//! Batch evaluation with optional memoization and cancellation.

use crate::{ApprovalContext, ContextKey, Error, Predicate, Result};
use identity::{GroupDirectory, ResolverSession};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Evaluator settings, read from the `[evaluation]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Remember results per (tree, context key) for the life of the evaluator.
    #[serde(default)]
    pub memoize: bool,
}

type MemoKey = (Arc<Predicate>, ContextKey);

/// Evaluates rule trees for one batch against one resolver session.
///
/// Memoized results are only valid as long as the session's group data,
/// so the memo lives and dies with the evaluator.
pub struct Evaluator<D> {
    session: Arc<ResolverSession<D>>,
    cancel: CancellationToken,
    memo: Option<RwLock<HashMap<MemoKey, bool>>>,
}

impl<D: GroupDirectory> Evaluator<D> {
    pub fn new(session: Arc<ResolverSession<D>>) -> Self {
        Self {
            session,
            cancel: CancellationToken::new(),
            memo: None,
        }
    }

    pub fn from_config(session: Arc<ResolverSession<D>>, config: &EvaluatorConfig) -> Self {
        let evaluator = Self::new(session);
        if config.memoize {
            evaluator.with_memo()
        } else {
            evaluator
        }
    }

    pub fn with_memo(mut self) -> Self {
        self.memo = Some(RwLock::new(HashMap::new()));
        self
    }

    /// Abandon evaluation between composite children once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn session(&self) -> &ResolverSession<D> {
        &self.session
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Evaluate `predicate` against `ctx`.
    ///
    /// Errors are returned as-is and never memoized.
    pub async fn matches(&self, predicate: &Arc<Predicate>, ctx: &ApprovalContext) -> Result<bool> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let Some(memo) = &self.memo else {
            return predicate.evaluate(ctx, &self.session, Some(&self.cancel)).await;
        };

        let key = (Arc::clone(predicate), ContextKey::for_predicate(predicate, ctx));
        if let Some(&hit) = memo.read().await.get(&key) {
            debug!(rule = %predicate, "memo hit");
            return Ok(hit);
        }

        let result = predicate
            .evaluate(ctx, &self.session, Some(&self.cancel))
            .await?;
        memo.write().await.insert(key, result);
        Ok(result)
    }

    /// Evaluate one tree against each context in order.
    pub async fn matches_each(
        &self,
        predicate: &Arc<Predicate>,
        contexts: &[ApprovalContext],
    ) -> Vec<Result<bool>> {
        let mut results = Vec::with_capacity(contexts.len());
        for ctx in contexts {
            results.push(self.matches(predicate, ctx).await);
        }
        results
    }

    /// Number of memoized results, or 0 when memoization is off.
    pub async fn memo_len(&self) -> usize {
        match &self.memo {
            Some(memo) => memo.read().await.len(),
            None => 0,
        }
    }
}
