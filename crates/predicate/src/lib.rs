//! Composable predicates for approval rules.
//!
//! A rule is an immutable tree of [`Predicate`] nodes, built once by a rule
//! compiler and evaluated many times against different [`ApprovalContext`]s.
//!
//! # Overview
//!
//! - **Leaves** ([`Leaf`]) test one fact: the uploader or approver is in a
//!   group, is a given account, or the vote has a given value.
//! - **Composites** ([`Composite`]) combine children with AND, OR or NOT.
//! - **Factory** ([`build_leaf`], [`build_composite`]) validates typed
//!   arguments from a compiler and produces nodes.
//! - **Engine** ([`rewrite`], [`simplify`], [`Interner`]) works on whole trees
//!   without mutating them.
//! - **Evaluator** ([`Evaluator`]) runs trees for one batch, sharing a
//!   [`ResolverSession`](identity::ResolverSession) and optionally memoizing
//!   results.
//!
//! Trees compare and hash structurally, so the same rule parsed twice is the
//! same key.
//!
//! # Example
//!
//! ```
//! use identity::{Account, AccountId, Directory, GroupId, ResolverSession};
//! use predicate::{build_leaf, ApprovalContext, Operand, PatchSet, PatchSetId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let directory = Directory::new()
//!     .with_account(Account::new(AccountId(1000)).with_group(GroupId::parse("devs")?));
//! let session = ResolverSession::new(directory);
//!
//! let rule = build_leaf("uploaderin", &[Operand::text("devs")])?;
//! let ctx = ApprovalContext::new(PatchSet {
//!     id: PatchSetId { change: 42, number: 1 },
//!     uploader: AccountId(1000),
//! });
//!
//! assert!(rule.matches(&ctx, &session).await?);
//! # Ok(())
//! # }
//! ```

mod context;
mod engine;
mod error;
mod evaluator;
mod factory;
mod predicate;

pub use context::{ApprovalContext, Consulted, ContextKey, PatchSet, PatchSetApproval, PatchSetId};
pub use engine::{Interner, rewrite, simplify};
pub use error::{Error, Result};
pub use evaluator::{Evaluator, EvaluatorConfig};
pub use factory::{Operand, build_composite, build_leaf, discriminants};
pub use predicate::{Comparison, Composite, Leaf, Operator, Predicate, UserField};
