use branchgate_core::enqueue::enqueue;
use branchgate_core::fakes::MemoryBuildServer;
use branchgate_core::{BranchKey, BuildParameters, CandidateSet, GateError};

const DEPLOY: &str = "Dev_Deploy";

fn candidates(names: &[&str]) -> CandidateSet {
    names
        .iter()
        .map(|n| BranchKey::normalize(n).unwrap())
        .collect()
}

fn ignore(prefixes: &[&str]) -> Vec<String> {
    prefixes.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn ignored_prefix_gets_no_enqueue() {
    let server = MemoryBuildServer::new("https://ci");
    let count = enqueue(
        &server,
        &candidates(&["hotfix-123"]),
        &ignore(&["hotfix-"]),
        DEPLOY,
        &BuildParameters::new(),
    )
    .await
    .unwrap();
    assert_eq!(count, 0);
    assert!(server.enqueued().is_empty());
}

#[tokio::test]
async fn non_ignored_branch_gets_exactly_one_enqueue() {
    let server = MemoryBuildServer::new("https://ci");
    let params = BuildParameters::new().with("domain", Some("feature-123"));
    let count = enqueue(
        &server,
        &candidates(&["feature-123"]),
        &ignore(&["hotfix-"]),
        DEPLOY,
        &params,
    )
    .await
    .unwrap();

    assert_eq!(count, 1);
    let enqueued = server.enqueued();
    assert_eq!(enqueued.len(), 1);
    assert_eq!(enqueued[0].branch.as_str(), "feature-123");
    assert_eq!(enqueued[0].build_type, DEPLOY);
    assert_eq!(enqueued[0].properties, params);
}

#[tokio::test]
async fn failing_enqueue_does_not_cancel_siblings() {
    let server = MemoryBuildServer::new("https://ci");
    server.fail_enqueue_for("b");

    let err = enqueue(
        &server,
        &candidates(&["a", "b", "c"]),
        &[],
        DEPLOY,
        &BuildParameters::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, GateError::BuildServer(_)));
    let mut branches: Vec<String> = server
        .enqueued()
        .iter()
        .map(|r| r.branch.to_string())
        .collect();
    branches.sort();
    assert_eq!(branches, vec!["a", "c"]);
}
