use branchgate_core::eligibility::{filter, has_unbuilt_changes};
use branchgate_core::fakes::{build, MemoryBuildServer};
use branchgate_core::{BranchKey, BuildStatus, CandidateSet, ChangeId, EligibilityRules, GateError};

const DEPLOY: &str = "Dev_Deploy";

fn key(name: &str) -> BranchKey {
    BranchKey::normalize(name).unwrap()
}

fn candidates(names: &[&str]) -> CandidateSet {
    names.iter().map(|n| key(n)).collect()
}

fn watching(types: &[&str]) -> EligibilityRules {
    EligibilityRules {
        watched_build_types: types.iter().map(|s| s.to_string()).collect(),
        ignore_prefixes: vec![],
    }
}

fn names(set: &CandidateSet) -> Vec<String> {
    set.iter().map(|b| b.to_string()).collect()
}

// ---- running / queued ----

#[tokio::test]
async fn running_watched_build_removes_branch() {
    let server = MemoryBuildServer::new("https://ci");
    server.add_running(build(1, DEPLOY, "refs/heads/a", BuildStatus::Unknown));

    let result = filter(&server, candidates(&["a", "b"]), DEPLOY, &watching(&[DEPLOY]))
        .await
        .unwrap();
    assert_eq!(names(&result), vec!["b"]);
}

#[tokio::test]
async fn running_unwatched_build_keeps_branch() {
    let server = MemoryBuildServer::new("https://ci");
    server.add_running(build(1, "Dev_Lint", "a", BuildStatus::Unknown));

    let result = filter(&server, candidates(&["a"]), DEPLOY, &watching(&[DEPLOY]))
        .await
        .unwrap();
    assert_eq!(names(&result), vec!["a"]);
}

#[tokio::test]
async fn empty_watch_list_blocks_on_any_build_type() {
    let server = MemoryBuildServer::new("https://ci");
    server.add_queued(build(1, "Dev_Lint", "a", BuildStatus::Unknown));

    let result = filter(&server, candidates(&["a", "b"]), DEPLOY, &watching(&[]))
        .await
        .unwrap();
    assert_eq!(names(&result), vec!["b"]);
}

#[tokio::test]
async fn result_never_contains_running_branch() {
    let server = MemoryBuildServer::new("https://ci");
    for (id, branch) in ["a", "c", "e"].iter().enumerate() {
        server.add_running(build(id as u64 + 1, DEPLOY, branch, BuildStatus::Unknown));
    }

    let input = candidates(&["a", "b", "c", "d", "e", "f"]);
    let result = filter(&server, input.clone(), DEPLOY, &watching(&[DEPLOY]))
        .await
        .unwrap();
    for branch in result.iter() {
        assert!(input.contains(branch));
        assert!(!["a", "c", "e"].contains(&branch.as_str()));
    }
    assert_eq!(result.len(), 3);
}

#[tokio::test]
async fn queued_and_no_history_end_to_end() {
    let server = MemoryBuildServer::new("https://ci");
    server.add_queued(build(5, DEPLOY, "a", BuildStatus::Unknown));

    let result = filter(&server, candidates(&["a", "b"]), DEPLOY, &watching(&[DEPLOY]))
        .await
        .unwrap();
    assert_eq!(names(&result), vec!["b"]);
}

// ---- unbuilt changes ----

#[tokio::test]
async fn no_success_build_means_unbuilt_changes() {
    let server = MemoryBuildServer::new("https://ci");
    server.add_finished(build(3, DEPLOY, "a", BuildStatus::Failure));
    server.add_finished(build(4, DEPLOY, "a", BuildStatus::Error));

    assert!(has_unbuilt_changes(&server, DEPLOY, &key("a")).await.unwrap());
}

#[tokio::test]
async fn up_to_date_branch_has_no_unbuilt_changes() {
    let server = MemoryBuildServer::new("https://ci");
    let mut last = build(7, DEPLOY, "a", BuildStatus::Success);
    last.last_change = Some(ChangeId(100));
    server.add_finished(last);
    server.add_change("a", DEPLOY, 99);
    server.add_change("a", DEPLOY, 100);

    assert!(!has_unbuilt_changes(&server, DEPLOY, &key("a")).await.unwrap());

    let result = filter(&server, candidates(&["a"]), DEPLOY, &watching(&[DEPLOY]))
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn most_recent_success_is_highest_id() {
    let server = MemoryBuildServer::new("https://ci");
    let mut newer = build(20, DEPLOY, "a", BuildStatus::Success);
    newer.last_change = Some(ChangeId(200));
    let mut older = build(10, DEPLOY, "a", BuildStatus::Success);
    older.last_change = Some(ChangeId(150));
    // listed out of order on purpose
    server.add_finished(newer);
    server.add_finished(older);
    server.add_finished(build(30, DEPLOY, "a", BuildStatus::Failure));
    server.add_change("a", DEPLOY, 180);

    // change 180 is only newer than the build with id 10
    assert!(!has_unbuilt_changes(&server, DEPLOY, &key("a")).await.unwrap());
}

#[tokio::test]
async fn success_without_last_change_uses_full_change_list() {
    let server = MemoryBuildServer::new("https://ci");
    server.add_finished(build(7, DEPLOY, "a", BuildStatus::Success));
    assert!(!has_unbuilt_changes(&server, DEPLOY, &key("a")).await.unwrap());

    server.add_change("a", DEPLOY, 1);
    assert!(has_unbuilt_changes(&server, DEPLOY, &key("a")).await.unwrap());
}

#[tokio::test]
async fn changes_on_other_build_type_are_ignored() {
    let server = MemoryBuildServer::new("https://ci");
    let mut last = build(7, DEPLOY, "a", BuildStatus::Success);
    last.last_change = Some(ChangeId(100));
    server.add_finished(last);
    server.add_change("a", "Dev_Unit", 101);

    assert!(!has_unbuilt_changes(&server, DEPLOY, &key("a")).await.unwrap());
}

// ---- failures ----

#[tokio::test]
async fn remote_failure_aborts_filtering() {
    let server = MemoryBuildServer::new("https://ci");
    server.set_unavailable();

    let err = filter(&server, candidates(&["a"]), DEPLOY, &watching(&[DEPLOY]))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::BuildServer(_)));
}
