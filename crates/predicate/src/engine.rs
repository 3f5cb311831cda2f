//! Whole-tree operations: rewriting, simplification and deduplication.

use crate::{Operator, Predicate, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Rebuild a tree bottom-up.
///
/// Every node is rebuilt with [`Predicate::copy`] around its rewritten
/// children and then handed to `transform`. The input tree is untouched.
pub fn rewrite<F>(predicate: &Predicate, transform: &mut F) -> Result<Predicate>
where
    F: FnMut(Predicate) -> Result<Predicate>,
{
    let children = predicate
        .children()
        .iter()
        .map(|child| rewrite(child, transform))
        .collect::<Result<Vec<_>>>()?;
    transform(predicate.copy(children)?)
}

/// Normalize a tree without changing what it matches.
///
/// - nested AND/OR of the same operator are flattened
/// - repeated siblings are dropped, keeping the first
/// - AND/OR with a single child collapse to that child
/// - `NOT NOT p` becomes `p`
pub fn simplify(predicate: &Predicate) -> Result<Predicate> {
    rewrite(predicate, &mut simplify_node)
}

fn simplify_node(node: Predicate) -> Result<Predicate> {
    match node.operator() {
        None => Ok(node),
        Some(Operator::Not) => match node.children() {
            [child] if child.operator() == Some(Operator::Not) => Ok(child.children()[0].clone()),
            _ => Ok(node),
        },
        Some(op) => {
            let mut seen = HashSet::new();
            let mut flat = Vec::new();
            for child in node.children() {
                let parts = if child.operator() == Some(op) {
                    child.children()
                } else {
                    std::slice::from_ref(child)
                };
                for part in parts {
                    if seen.insert(part) {
                        flat.push(part.clone());
                    }
                }
            }
            if flat.len() == 1 {
                return Ok(flat.remove(0));
            }
            node.copy(flat)
        }
    }
}

/// Shares one allocation between structurally equal trees.
///
/// Rules parsed separately from the same source intern to the same `Arc`,
/// which makes them cheap to clone and to use as memo keys.
#[derive(Debug, Default)]
pub struct Interner {
    trees: HashSet<Arc<Predicate>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, predicate: Predicate) -> Arc<Predicate> {
        if let Some(existing) = self.trees.get(&predicate) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(predicate);
        self.trees.insert(Arc::clone(&shared));
        shared
    }

    /// Number of distinct trees held.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
