//! Facts a predicate is evaluated against.

use crate::Predicate;
use identity::AccountId;
use serde::{Deserialize, Serialize};

/// Identifies a patch set: change number plus patch set number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchSetId {
    pub change: u32,
    pub number: u32,
}

impl std::fmt::Display for PatchSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.change, self.number)
    }
}

/// The patch set a rule is evaluated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    pub id: PatchSetId,
    pub uploader: AccountId,
}

/// A vote on a patch set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSetApproval {
    pub account_id: AccountId,
    pub label: String,
    pub value: i16,
}

/// Everything a predicate may consult, fixed before evaluation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalContext {
    pub target: PatchSet,
    #[serde(default)]
    pub approval: Option<PatchSetApproval>,
}

impl ApprovalContext {
    pub fn new(target: PatchSet) -> Self {
        Self {
            target,
            approval: None,
        }
    }

    pub fn with_approval(mut self, approval: PatchSetApproval) -> Self {
        self.approval = Some(approval);
        self
    }

    pub fn uploader(&self) -> AccountId {
        self.target.uploader
    }

    pub fn approver(&self) -> Option<AccountId> {
        self.approval.as_ref().map(|a| a.account_id)
    }

    pub fn value(&self) -> Option<i16> {
        self.approval.as_ref().map(|a| a.value)
    }
}

/// Which context fields a predicate reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Consulted {
    pub uploader: bool,
    pub approver: bool,
    pub value: bool,
}

impl Consulted {
    pub fn union(self, other: Self) -> Self {
        Self {
            uploader: self.uploader || other.uploader,
            approver: self.approver || other.approver,
            value: self.value || other.value,
        }
    }
}

/// Stable cache key for one context, limited to the fields a predicate reads.
///
/// Two contexts with the same key produce the same result for that
/// predicate within one resolver session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub uploader: Option<AccountId>,
    pub approver: Option<AccountId>,
    pub value: Option<i16>,
}

impl ContextKey {
    pub fn new(ctx: &ApprovalContext, consulted: Consulted) -> Self {
        Self {
            uploader: consulted.uploader.then(|| ctx.uploader()),
            approver: if consulted.approver { ctx.approver() } else { None },
            value: if consulted.value { ctx.value() } else { None },
        }
    }

    pub fn for_predicate(predicate: &Predicate, ctx: &ApprovalContext) -> Self {
        Self::new(ctx, predicate.consults())
    }
}
