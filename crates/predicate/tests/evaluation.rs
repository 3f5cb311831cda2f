//! End-to-end evaluation against a call-counting directory.

use identity::{AccountId, GroupDirectory, GroupId, GroupSet, ResolutionError, ResolverSession};
use predicate::{
    ApprovalContext, Error, Evaluator, Interner, Operand, Operator, PatchSet, PatchSetApproval,
    PatchSetId, Predicate, build_composite, build_leaf,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const U1: AccountId = AccountId(1);
const U2: AccountId = AccountId(2);

#[derive(Default)]
struct StubDirectory {
    memberships: HashMap<AccountId, Vec<&'static str>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<AccountId>>,
}

impl StubDirectory {
    fn with(mut self, account: AccountId, groups: &[&'static str]) -> Self {
        self.memberships.insert(account, groups.to_vec());
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls_for(&self, account: AccountId) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|a| **a == account)
            .count()
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl GroupDirectory for StubDirectory {
    async fn effective_groups(&self, account: AccountId) -> Result<GroupSet, ResolutionError> {
        self.calls.lock().unwrap().push(account);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let groups = self
            .memberships
            .get(&account)
            .ok_or(ResolutionError::UnknownAccount(account))?;
        Ok(groups.iter().map(|g| GroupId::parse(*g).unwrap()).collect())
    }
}

fn ctx() -> ApprovalContext {
    ApprovalContext::new(PatchSet {
        id: PatchSetId {
            change: 100,
            number: 3,
        },
        uploader: U1,
    })
    .with_approval(PatchSetApproval {
        account_id: U2,
        label: "Code-Review".to_string(),
        value: 2,
    })
}

fn leaf(discriminant: &str, group: &str) -> Predicate {
    build_leaf(discriminant, &[Operand::text(group)]).unwrap()
}

#[tokio::test]
async fn uploader_in_group_matches() {
    let directory = StubDirectory::default().with(U1, &["G1", "G2"]);
    let session = ResolverSession::new(directory);
    let rule = leaf("uploaderin", "G1");
    assert!(rule.matches(&ctx(), &session).await.unwrap());
}

#[tokio::test]
async fn uploader_without_groups_does_not_match() {
    let directory = StubDirectory::default().with(U1, &[]);
    let session = ResolverSession::new(directory);
    let rule = leaf("uploaderin", "G1");
    assert!(!rule.matches(&ctx(), &session).await.unwrap());
}

#[tokio::test]
async fn and_resolves_each_principal_once() {
    let directory = Arc::new(StubDirectory::default().with(U1, &["G1", "G2"]).with(U2, &["G1"]));
    let session = ResolverSession::new(Arc::clone(&directory));
    let rule = build_composite(
        Operator::And,
        vec![leaf("uploaderin", "G1"), leaf("approverin", "G3")],
    )
    .unwrap();

    assert!(!rule.matches(&ctx(), &session).await.unwrap());
    assert_eq!(directory.calls_for(U1), 1);
    assert_eq!(directory.calls_for(U2), 1);
}

#[tokio::test]
async fn and_skips_resolver_for_unreached_children() {
    let directory = Arc::new(StubDirectory::default().with(U1, &[]).with(U2, &["G3"]));
    let session = ResolverSession::new(Arc::clone(&directory));
    let rule = build_composite(
        Operator::And,
        vec![leaf("uploaderin", "G1"), leaf("approverin", "G3")],
    )
    .unwrap();

    assert!(!rule.matches(&ctx(), &session).await.unwrap());
    assert_eq!(directory.calls_for(U1), 1);
    assert_eq!(directory.calls_for(U2), 0);
}

#[tokio::test]
async fn or_skips_resolver_after_first_true() {
    let directory = Arc::new(StubDirectory::default().with(U1, &["G1"]).with(U2, &[]));
    let session = ResolverSession::new(Arc::clone(&directory));
    let rule = build_composite(
        Operator::Or,
        vec![leaf("uploaderin", "G1"), leaf("approverin", "G3")],
    )
    .unwrap();

    assert!(rule.matches(&ctx(), &session).await.unwrap());
    assert_eq!(directory.total_calls(), 1);
}

#[tokio::test]
async fn repeated_principal_in_tree_costs_one_lookup() {
    let directory = Arc::new(StubDirectory::default().with(U1, &["G2"]));
    let session = ResolverSession::new(Arc::clone(&directory));
    let rule = build_composite(
        Operator::Or,
        vec![
            leaf("uploaderin", "G1"),
            leaf("uploaderin", "G3"),
            leaf("uploaderin", "G2"),
        ],
    )
    .unwrap();

    assert!(rule.matches(&ctx(), &session).await.unwrap());
    assert_eq!(directory.calls_for(U1), 1);
}

#[tokio::test]
async fn approver_leaf_without_approval_is_invalid_context() {
    let directory = StubDirectory::default().with(U1, &["G1"]);
    let session = ResolverSession::new(directory);
    let no_approval = ApprovalContext::new(ctx().target);

    let err = leaf("approverin", "G1")
        .matches(&no_approval, &session)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidContext(_)), "{err}");
}

#[tokio::test(start_paused = true)]
async fn resolver_timeout_surfaces_as_resolution_error() {
    let directory = StubDirectory::default()
        .with(U1, &["G1"])
        .slow(Duration::from_secs(30));
    let session = ResolverSession::new(directory).with_timeout(Duration::from_millis(50));

    let result = leaf("uploaderin", "G1").matches(&ctx(), &session).await;
    match result {
        Err(Error::Resolution(ResolutionError::Timeout { account, .. })) => assert_eq!(account, U1),
        other => panic!("expected a resolution timeout, got {other:?}"),
    }

    // NOT must not turn the failure into a match either.
    let negated = Predicate::not(leaf("uploaderin", "G1"));
    let err = negated.matches(&ctx(), &session).await.unwrap_err();
    assert!(err.is_resolution());
}

#[tokio::test]
async fn unknown_principal_is_not_a_false() {
    let directory = StubDirectory::default();
    let session = ResolverSession::new(directory);
    let err = leaf("uploaderin", "G1")
        .matches(&ctx(), &session)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Resolution(ResolutionError::UnknownAccount(U1)));
}

#[tokio::test]
async fn error_in_first_child_aborts_and() {
    let directory = Arc::new(StubDirectory::default().with(U2, &["G3"]));
    let session = ResolverSession::new(Arc::clone(&directory));
    let rule = build_composite(
        Operator::And,
        vec![leaf("uploaderin", "G1"), leaf("approverin", "G3")],
    )
    .unwrap();

    let err = rule.matches(&ctx(), &session).await.unwrap_err();
    assert!(err.is_resolution());
    assert_eq!(directory.calls_for(U2), 0);
}

#[tokio::test]
async fn interned_rules_share_memo_entries() {
    let directory = Arc::new(StubDirectory::default().with(U1, &["G1"]));
    let session = Arc::new(ResolverSession::new(Arc::clone(&directory)));
    let evaluator = Evaluator::new(session).with_memo();

    let mut interner = Interner::new();
    let first = interner.intern(leaf("uploaderin", "G1"));
    let second = interner.intern(leaf("uploaderin", "G1"));

    assert!(evaluator.matches(&first, &ctx()).await.unwrap());
    assert!(evaluator.matches(&second, &ctx()).await.unwrap());
    assert_eq!(evaluator.memo_len().await, 1);
    assert_eq!(directory.total_calls(), 1);
}

#[tokio::test]
async fn cancellation_between_children() {
    let directory = Arc::new(StubDirectory::default().with(U1, &["G1"]).with(U2, &["G3"]));
    let session = ResolverSession::new(Arc::clone(&directory));
    let token = CancellationToken::new();
    token.cancel();

    let rule = build_composite(
        Operator::And,
        vec![leaf("uploaderin", "G1"), leaf("approverin", "G3")],
    )
    .unwrap();
    let err = rule
        .matches_cancellable(&ctx(), &session, &token)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert_eq!(directory.total_calls(), 0);
}

#[tokio::test]
async fn shared_tree_across_tasks() {
    let directory = Arc::new(StubDirectory::default().with(U1, &["G1"]).with(U2, &["G3"]));
    let session = Arc::new(ResolverSession::new(Arc::clone(&directory)));
    let rule = Arc::new(
        build_composite(
            Operator::And,
            vec![leaf("uploaderin", "G1"), leaf("approverin", "G3")],
        )
        .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..4 {
        let rule = Arc::clone(&rule);
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move { rule.matches(&ctx(), &session).await }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Ok(true));
    }
    assert!(directory.calls_for(U1) >= 1);
}
