//! Predicate trees over an [`ApprovalContext`].

use crate::context::Consulted;
use crate::{ApprovalContext, Error, Result};
use identity::{AccountId, GroupDirectory, GroupId, ResolverSession};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Boxed evaluation future, needed because evaluation recurses.
pub(crate) type EvalFuture<'a> = Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

/// Which context field supplies the principal for a user leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserField {
    Uploader,
    Approver,
}

impl UserField {
    /// Select the principal from the context.
    ///
    /// Asking for the approver of a context without an approval is a caller
    /// bug and fails with [`Error::InvalidContext`].
    pub fn principal(self, ctx: &ApprovalContext) -> Result<AccountId> {
        match self {
            UserField::Uploader => Ok(ctx.uploader()),
            UserField::Approver => ctx.approver().ok_or_else(|| {
                Error::InvalidContext(format!(
                    "approver requested but patch set {} has no approval in context",
                    ctx.target.id
                ))
            }),
        }
    }
}

/// Numeric comparison against the approval value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    pub fn apply(self, actual: i16, expected: i16) -> bool {
        match self {
            Comparison::Eq => actual == expected,
            Comparison::Lt => actual < expected,
            Comparison::Le => actual <= expected,
            Comparison::Gt => actual > expected,
            Comparison::Ge => actual >= expected,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

/// A predicate with no children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Leaf {
    /// The selected user is effectively a member of `group`.
    UserIn { field: UserField, group: GroupId },
    /// The selected user is `account`.
    UserIs { field: UserField, account: AccountId },
    /// The approval value compares true against `value`.
    Value { op: Comparison, value: i16 },
}

impl Leaf {
    /// Factory key that builds this kind of leaf.
    pub fn discriminant(&self) -> &'static str {
        match self {
            Leaf::UserIn { field: UserField::Uploader, .. } => "uploaderin",
            Leaf::UserIn { field: UserField::Approver, .. } => "approverin",
            Leaf::UserIs { field: UserField::Uploader, .. } => "uploader",
            Leaf::UserIs { field: UserField::Approver, .. } => "approver",
            Leaf::Value { .. } => "value",
        }
    }

    pub fn consults(&self) -> Consulted {
        let field = |f: &UserField| Consulted {
            uploader: *f == UserField::Uploader,
            approver: *f == UserField::Approver,
            value: false,
        };
        match self {
            Leaf::UserIn { field: f, .. } | Leaf::UserIs { field: f, .. } => field(f),
            Leaf::Value { .. } => Consulted {
                value: true,
                ..Consulted::default()
            },
        }
    }

    /// Evaluate against `ctx`, consulting `session` for group leaves only.
    pub async fn matches<D: GroupDirectory>(
        &self,
        ctx: &ApprovalContext,
        session: &ResolverSession<D>,
    ) -> Result<bool> {
        match self {
            Leaf::UserIn { field, group } => {
                let account = field.principal(ctx)?;
                Ok(session.is_member(account, group).await?)
            }
            Leaf::UserIs { field, account } => Ok(field.principal(ctx)? == *account),
            Leaf::Value { op, value } => {
                let actual = ctx.value().ok_or_else(|| {
                    Error::InvalidContext(format!(
                        "value requested but patch set {} has no approval in context",
                        ctx.target.id
                    ))
                })?;
                Ok(op.apply(actual, *value))
            }
        }
    }
}

impl std::fmt::Display for Leaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Leaf::UserIn { group, .. } => write!(f, "{}:{group}", self.discriminant()),
            Leaf::UserIs { account, .. } => write!(f, "{}:{account}", self.discriminant()),
            Leaf::Value {
                op: Comparison::Eq,
                value,
            } => write!(f, "value:{value}"),
            Leaf::Value { op, value } => write!(f, "value:{}{value}", op.symbol()),
        }
    }
}

/// Boolean operator of a composite node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    And,
    Or,
    Not,
}

impl Operator {
    /// Check a child count against this operator's arity.
    pub fn check_arity(self, count: usize) -> Result<()> {
        match (self, count) {
            (Operator::Not, 1) => Ok(()),
            (Operator::Not, n) => Err(Error::InvalidArgument(format!(
                "NOT takes exactly one child, got {n}"
            ))),
            (op, 0) => Err(Error::InvalidArgument(format!(
                "{op} takes at least one child"
            ))),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        })
    }
}

impl std::str::FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Operator::And),
            "or" => Ok(Operator::Or),
            "not" => Ok(Operator::Not),
            other => Err(Error::InvalidArgument(format!("unknown operator: {other}"))),
        }
    }
}

/// An operator applied to an ordered list of children.
///
/// Fields are private: every `Composite` in existence passed the arity check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CompositeRepr", into = "CompositeRepr")]
pub struct Composite {
    op: Operator,
    children: Vec<Predicate>,
}

#[derive(Serialize, Deserialize)]
struct CompositeRepr {
    op: Operator,
    children: Vec<Predicate>,
}

impl TryFrom<CompositeRepr> for Composite {
    type Error = Error;

    fn try_from(repr: CompositeRepr) -> Result<Self> {
        Composite::new(repr.op, repr.children)
    }
}

impl From<Composite> for CompositeRepr {
    fn from(c: Composite) -> Self {
        CompositeRepr {
            op: c.op,
            children: c.children,
        }
    }
}

impl Composite {
    pub fn new(op: Operator, children: Vec<Predicate>) -> Result<Self> {
        op.check_arity(children.len())?;
        Ok(Self { op, children })
    }

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn children(&self) -> &[Predicate] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Predicate> {
        self.children
    }
}

/// A node in an immutable predicate tree.
///
/// Equality and hashing are structural, so trees built independently from
/// the same rule compare equal and can serve as cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    Leaf(Leaf),
    Composite(Composite),
}

impl Predicate {
    pub fn leaf(leaf: Leaf) -> Self {
        Predicate::Leaf(leaf)
    }

    pub fn user_in(field: UserField, group: GroupId) -> Self {
        Predicate::Leaf(Leaf::UserIn { field, group })
    }

    pub fn user_is(field: UserField, account: AccountId) -> Self {
        Predicate::Leaf(Leaf::UserIs { field, account })
    }

    pub fn and(children: Vec<Predicate>) -> Result<Self> {
        Ok(Predicate::Composite(Composite::new(Operator::And, children)?))
    }

    pub fn or(children: Vec<Predicate>) -> Result<Self> {
        Ok(Predicate::Composite(Composite::new(Operator::Or, children)?))
    }

    pub fn not(child: Predicate) -> Self {
        Predicate::Composite(Composite {
            op: Operator::Not,
            children: vec![child],
        })
    }

    /// The operator, or `None` for leaves.
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Predicate::Leaf(_) => None,
            Predicate::Composite(c) => Some(c.op),
        }
    }

    pub fn children(&self) -> &[Predicate] {
        match self {
            Predicate::Leaf(_) => &[],
            Predicate::Composite(c) => &c.children,
        }
    }

    /// Rebuild this node around new children.
    ///
    /// Composites keep their operator and check the new arity. Leaves have
    /// no children and return themselves unchanged whatever is passed, so
    /// tree rewrites can call `copy` on every node alike.
    pub fn copy(&self, children: Vec<Predicate>) -> Result<Predicate> {
        match self {
            Predicate::Leaf(_) => Ok(self.clone()),
            Predicate::Composite(c) => Ok(Predicate::Composite(Composite::new(c.op, children)?)),
        }
    }

    /// Union of the context fields read anywhere in the tree.
    pub fn consults(&self) -> Consulted {
        match self {
            Predicate::Leaf(leaf) => leaf.consults(),
            Predicate::Composite(c) => c
                .children
                .iter()
                .fold(Consulted::default(), |acc, child| acc.union(child.consults())),
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(Predicate::depth).max().unwrap_or(0)
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Leaf(_) => 1,
            Predicate::Composite(c) => c.children.iter().map(Predicate::leaf_count).sum(),
        }
    }

    /// Evaluate the tree against `ctx`.
    ///
    /// Children are evaluated left to right. AND stops at the first `false`,
    /// OR at the first `true`; unreached children never touch the resolver.
    /// Any error aborts the enclosing composite.
    pub async fn matches<D: GroupDirectory>(
        &self,
        ctx: &ApprovalContext,
        session: &ResolverSession<D>,
    ) -> Result<bool> {
        self.evaluate(ctx, session, None).await
    }

    /// Like [`matches`](Self::matches), checking `cancel` before each
    /// composite child.
    pub async fn matches_cancellable<D: GroupDirectory>(
        &self,
        ctx: &ApprovalContext,
        session: &ResolverSession<D>,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.evaluate(ctx, session, Some(cancel)).await
    }

    pub(crate) fn evaluate<'a, D: GroupDirectory>(
        &'a self,
        ctx: &'a ApprovalContext,
        session: &'a ResolverSession<D>,
        cancel: Option<&'a CancellationToken>,
    ) -> EvalFuture<'a> {
        Box::pin(async move {
            let composite = match self {
                Predicate::Leaf(leaf) => return leaf.matches(ctx, session).await,
                Predicate::Composite(c) => c,
            };

            match composite.op {
                Operator::And => {
                    for child in &composite.children {
                        check_cancelled(cancel)?;
                        if !child.evaluate(ctx, session, cancel).await? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Operator::Or => {
                    for child in &composite.children {
                        check_cancelled(cancel)?;
                        if child.evaluate(ctx, session, cancel).await? {
                            return Ok(true);
                        }
                    }
                    Ok(false)
                }
                Operator::Not => {
                    check_cancelled(cancel)?;
                    let child = composite.children.first().ok_or_else(|| {
                        Error::InvalidArgument("NOT without a child".to_string())
                    })?;
                    Ok(!child.evaluate(ctx, session, cancel).await?)
                }
            }
        })
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(Error::Cancelled),
        _ => Ok(()),
    }
}

impl From<Leaf> for Predicate {
    fn from(leaf: Leaf) -> Self {
        Predicate::Leaf(leaf)
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Leaf(leaf) => write!(f, "{leaf}"),
            Predicate::Composite(c) if c.op == Operator::Not => {
                write!(f, "NOT {}", c.children[0])
            }
            Predicate::Composite(c) => {
                f.write_str("(")?;
                for (i, child) in c.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", c.op)?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}
