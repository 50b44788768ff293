//! In-memory fakes for the collaborator traits (testing only)
//!
//! `MemoryBuildServer` and `MemoryIssueTracker` answer queries from seeded
//! state and record every side effect, so tests can assert on exactly which
//! builds were enqueued and which issues were moved.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::branch::BranchKey;
use crate::collaborators::*;
use crate::error::{RemoteError, RemoteResult};
use crate::model::{Build, BuildId, BuildStatus, Change, ChangeId, Issue};

/// Build with the given id, configuration, branch and status.
pub fn build(id: u64, build_type: &str, branch: &str, status: BuildStatus) -> Build {
    Build {
        id: BuildId(id),
        build_type_id: build_type.to_string(),
        status,
        status_text: None,
        branch_name: Some(branch.to_string()),
        last_change: None,
    }
}

/// Issue with the given key, gate status, resolution and branch field.
pub fn issue(key: &str, status: &str, resolution: Option<&str>, branch: Option<&str>) -> Issue {
    Issue {
        key: key.to_string(),
        status: Some(status.to_string()),
        resolution: resolution.map(str::to_string),
        branch: branch.and_then(BranchKey::normalize),
    }
}

fn not_found(what: &str) -> RemoteError {
    RemoteError::Status {
        status: 404,
        description: "Not Found".to_string(),
        body: format!("No {} found", what),
    }
}

fn server_error(what: &str) -> RemoteError {
    RemoteError::Status {
        status: 500,
        description: "Internal Server Error".to_string(),
        body: what.to_string(),
    }
}

// ---------------------------------------------------------------------------
// MemoryBuildServer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct BuildServerState {
    running: Vec<Build>,
    queued: Vec<Build>,
    finished: Vec<Build>,
    changes: Vec<(BranchKey, String, ChangeId)>,
    enqueued: Vec<EnqueueRequest>,
    failing_branches: HashSet<BranchKey>,
    unavailable: bool,
}

/// In-memory build server.
#[derive(Debug, Default)]
pub struct MemoryBuildServer {
    display_url: String,
    state: Mutex<BuildServerState>,
}

impl MemoryBuildServer {
    pub fn new(display_url: &str) -> Self {
        Self {
            display_url: display_url.to_string(),
            state: Mutex::default(),
        }
    }

    pub fn add_running(&self, build: Build) {
        self.state.lock().unwrap().running.push(build);
    }

    pub fn add_queued(&self, build: Build) {
        self.state.lock().unwrap().queued.push(build);
    }

    pub fn add_finished(&self, build: Build) {
        self.state.lock().unwrap().finished.push(build);
    }

    pub fn add_change(&self, branch: &str, build_type: &str, id: u64) {
        if let Some(branch) = BranchKey::normalize(branch) {
            self.state
                .lock()
                .unwrap()
                .changes
                .push((branch, build_type.to_string(), ChangeId(id)));
        }
    }

    /// Make every enqueue for `branch` fail with a server error.
    pub fn fail_enqueue_for(&self, branch: &str) {
        if let Some(branch) = BranchKey::normalize(branch) {
            self.state.lock().unwrap().failing_branches.insert(branch);
        }
    }

    /// Make every call fail with a server error.
    pub fn set_unavailable(&self) {
        self.state.lock().unwrap().unavailable = true;
    }

    /// Every request accepted so far, in call order.
    pub fn enqueued(&self) -> Vec<EnqueueRequest> {
        self.state.lock().unwrap().enqueued.clone()
    }

    fn check_available(state: &BuildServerState) -> RemoteResult<()> {
        if state.unavailable {
            Err(server_error("build server unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BuildServer for MemoryBuildServer {
    async fn list_builds(&self, locator: &BuildLocator) -> RemoteResult<Vec<Build>> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(match locator {
            BuildLocator::Running => state.running.clone(),
            BuildLocator::Branch { branch, build_type } => state
                .finished
                .iter()
                .filter(|b| &b.build_type_id == build_type)
                .filter(|b| b.branch_key().as_ref() == Some(branch))
                .cloned()
                .collect(),
        })
    }

    async fn queued_builds(&self) -> RemoteResult<Vec<Build>> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state.queued.clone())
    }

    async fn build(&self, id: BuildId) -> RemoteResult<Build> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        state
            .finished
            .iter()
            .chain(state.running.iter())
            .chain(state.queued.iter())
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| not_found(&format!("build by locator 'id:{}'", id)))
    }

    async fn list_changes(&self, locator: &ChangeLocator) -> RemoteResult<Vec<Change>> {
        let state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        Ok(state
            .changes
            .iter()
            .filter(|(branch, build_type, _)| {
                branch == &locator.branch && build_type == &locator.build_type
            })
            .filter(|(_, _, id)| locator.since.map_or(true, |since| *id > since))
            .map(|(_, _, id)| Change { id: *id })
            .collect())
    }

    async fn enqueue(&self, request: &EnqueueRequest) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_available(&state)?;
        if state.failing_branches.contains(&request.branch) {
            return Err(server_error(&format!(
                "cannot enqueue branch {}",
                request.branch
            )));
        }
        state.enqueued.push(request.clone());
        Ok(())
    }

    fn display_url(&self) -> &str {
        &self.display_url
    }
}

// ---------------------------------------------------------------------------
// MemoryIssueTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TrackerState {
    issues: Vec<Issue>,
    queries: Vec<IssueQuery>,
    transitions: Vec<(String, Transition)>,
    comments: Vec<(String, String)>,
    failing_issues: HashSet<String>,
}

/// In-memory issue tracker.
///
/// Transitions are recorded but do not change the seeded issues.
#[derive(Debug, Default)]
pub struct MemoryIssueTracker {
    state: Mutex<TrackerState>,
}

impl MemoryIssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&self, issue: Issue) {
        self.state.lock().unwrap().issues.push(issue);
    }

    /// Make every transition of `key` fail as an invalid transition.
    pub fn fail_transition_for(&self, key: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_issues
            .insert(key.to_string());
    }

    /// Every query asked so far, in call order.
    pub fn queries(&self) -> Vec<IssueQuery> {
        self.state.lock().unwrap().queries.clone()
    }

    /// `(issue key, transition)` pairs applied so far, in call order.
    pub fn transitions(&self) -> Vec<(String, Transition)> {
        self.state.lock().unwrap().transitions.clone()
    }

    /// `(issue key, body)` pairs added so far, in call order.
    pub fn comments(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().comments.clone()
    }

    fn matches(issue: &Issue, query: &IssueQuery) -> bool {
        let fixed = issue.resolution.as_deref() == Some("Fixed");
        let resolution_ok = match query.resolution {
            ResolutionFilter::Any => true,
            ResolutionFilter::Fixed => fixed,
            ResolutionFilter::NotFixed => !fixed,
        };
        let branch_ok = match &query.branch {
            Some(branch) => issue.branch.as_ref() == Some(branch),
            None => true,
        };
        issue.status.as_deref() == Some(query.status.as_str()) && resolution_ok && branch_ok
    }
}

#[async_trait]
impl IssueTracker for MemoryIssueTracker {
    async fn query(&self, query: &IssueQuery) -> RemoteResult<Vec<Issue>> {
        let mut state = self.state.lock().unwrap();
        state.queries.push(query.clone());
        Ok(state
            .issues
            .iter()
            .filter(|issue| Self::matches(issue, query))
            .cloned()
            .collect())
    }

    async fn transition(&self, issue: &Issue, transition: &Transition) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_issues.contains(&issue.key) {
            return Err(RemoteError::Status {
                status: 400,
                description: "Bad Request".to_string(),
                body: format!(
                    "Transition id '{}' is not valid for this issue.",
                    transition.id
                ),
            });
        }
        state
            .transitions
            .push((issue.key.clone(), transition.clone()));
        Ok(())
    }

    async fn add_comment(&self, issue: &Issue, body: &str) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.comments.push((issue.key.clone(), body.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_build_server_filters_changes_since() {
        let server = MemoryBuildServer::new("https://ci");
        server.add_change("a", "T", 10);
        server.add_change("a", "T", 11);
        server.add_change("b", "T", 12);

        let locator = ChangeLocator {
            branch: BranchKey::normalize("a").unwrap(),
            build_type: "T".to_string(),
            since: Some(ChangeId(10)),
        };
        let changes = server.list_changes(&locator).await.unwrap();
        assert_eq!(changes, vec![Change { id: ChangeId(11) }]);
    }

    #[tokio::test]
    async fn test_memory_build_server_unknown_build_is_404() {
        let server = MemoryBuildServer::new("https://ci");
        let err = server.build(BuildId(9)).await.unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_memory_tracker_matches_resolution_and_branch() {
        let tracker = MemoryIssueTracker::new();
        tracker.add_issue(issue("P-1", "Test", Some("Fixed"), Some("x")));
        tracker.add_issue(issue("P-2", "Test", None, None));
        tracker.add_issue(issue("P-3", "Release", Some("Fixed"), Some("x")));

        let branch = BranchKey::normalize("x").unwrap();
        let fixed = tracker
            .query(&IssueQuery::fixed_on("Test", &branch))
            .await
            .unwrap();
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].key, "P-1");

        let unresolved = tracker.query(&IssueQuery::unresolved("Test")).await.unwrap();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].key, "P-2");

        let all = tracker.query(&IssueQuery::at_gate("Test")).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
