//! Moving tracker issues through the test and release gates.
//!
//! An issue's gate state is never stored here. It is whatever the tracker
//! query at the start of the pass says:
//!
//! | bucket              | status       | resolution | branch field |
//! |---------------------|--------------|------------|--------------|
//! | test, fixed         | test gate    | Fixed      | the branch   |
//! | release, fixed      | release gate | Fixed      | the branch   |
//! | test, unresolved    | test gate    | not Fixed  | any          |
//! | release, unresolved | release gate | not Fixed  | any          |
//!
//! Fixed issues advance with the branch environment on success and fall back
//! with a comment on failure. Unresolved issues always advance with the
//! default environment. A failing transition aborts the pass; transitions
//! already applied stay applied.

use serde::{Deserialize, Serialize};

use crate::branch::BranchKey;
use crate::collaborators::{IssueQuery, IssueTracker, Transition};
use crate::eligibility::CandidateSet;
use crate::error::{GateError, Result};
use crate::model::{BuildId, Issue};
use crate::obs::{emit_issue_commented, emit_issue_transitioned, emit_sync_summary};

/// Tracker transition ids used by the gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionIds {
    pub to_test: String,
    pub to_release: String,
    pub failed_test: String,
    pub failed_release: String,
}

/// Tracker workflow the gates live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Status name of the "awaiting test" gate
    pub test_status: String,
    /// Status name of the "awaiting release" gate
    pub release_status: String,
    pub transitions: TransitionIds,
    /// Environment given to issues that have no branch of their own
    pub default_environment_url: String,
}

/// Input of one synchronization pass.
#[derive(Debug, Clone)]
pub struct SyncRequest<'a> {
    pub branch: &'a BranchKey,
    /// `None` when the checked build succeeded
    pub failure_reason: Option<&'a str>,
    /// Environment of the branch, set on issues that advance
    pub branch_url: Option<&'a str>,
    /// Public build server URL, for the link in failure comments
    pub build_server_url: &'a str,
    pub build_id: BuildId,
}

/// How many issues were moved per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub test_fixed: usize,
    pub release_fixed: usize,
    pub test_unresolved: usize,
    pub release_unresolved: usize,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.test_fixed + self.release_fixed + self.test_unresolved + self.release_unresolved
    }
}

/// Comment added to an issue sent back after a failed build.
pub fn failure_comment(reason: &str, build_server_url: &str, build_id: BuildId) -> String {
    format!(
        "Build failed. Error message: {}\n{}/viewLog.html?buildId={}",
        reason,
        build_server_url.trim_end_matches('/'),
        build_id
    )
}

/// Applies the gate transitions for one branch.
pub struct IssueStatusSynchronizer<'a> {
    tracker: &'a dyn IssueTracker,
    workflow: &'a WorkflowSettings,
}

impl<'a> IssueStatusSynchronizer<'a> {
    pub fn new(tracker: &'a dyn IssueTracker, workflow: &'a WorkflowSettings) -> Self {
        Self { tracker, workflow }
    }

    pub async fn synchronize(&self, request: &SyncRequest<'_>) -> Result<SyncReport> {
        let ids = &self.workflow.transitions;

        let test_fixed = self
            .query(&IssueQuery::fixed_on(&self.workflow.test_status, request.branch))
            .await?;
        let release_fixed = self
            .query(&IssueQuery::fixed_on(
                &self.workflow.release_status,
                request.branch,
            ))
            .await?;

        match request.failure_reason {
            None => {
                let environment = request.branch_url.map(str::to_string);
                self.advance(&test_fixed, &ids.to_test, environment.clone(), "test_fixed")
                    .await?;
                self.advance(&release_fixed, &ids.to_release, environment, "release_fixed")
                    .await?;
            }
            Some(reason) => {
                let comment = failure_comment(reason, request.build_server_url, request.build_id);
                self.fail_back(&test_fixed, &ids.failed_test, &comment, "test_fixed")
                    .await?;
                self.fail_back(&release_fixed, &ids.failed_release, &comment, "release_fixed")
                    .await?;
            }
        }

        let default_environment = Some(self.workflow.default_environment_url.clone());
        let test_unresolved = self
            .query(&IssueQuery::unresolved(&self.workflow.test_status))
            .await?;
        self.advance(
            &test_unresolved,
            &ids.to_test,
            default_environment.clone(),
            "test_unresolved",
        )
        .await?;

        let release_unresolved = self
            .query(&IssueQuery::unresolved(&self.workflow.release_status))
            .await?;
        self.advance(
            &release_unresolved,
            &ids.to_release,
            default_environment,
            "release_unresolved",
        )
        .await?;

        let report = SyncReport {
            test_fixed: test_fixed.len(),
            release_fixed: release_fixed.len(),
            test_unresolved: test_unresolved.len(),
            release_unresolved: release_unresolved.len(),
        };
        emit_sync_summary(
            request.branch,
            request.branch_url,
            request.failure_reason.is_some(),
            [
                report.test_fixed,
                report.release_fixed,
                report.test_unresolved,
                report.release_unresolved,
            ],
        );
        Ok(report)
    }

    async fn query(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        self.tracker.query(query).await.map_err(GateError::Tracker)
    }

    async fn advance(
        &self,
        issues: &[Issue],
        transition_id: &str,
        environment: Option<String>,
        bucket: &str,
    ) -> Result<()> {
        let transition = Transition {
            id: transition_id.to_string(),
            environment,
        };
        for issue in issues {
            self.tracker
                .transition(issue, &transition)
                .await
                .map_err(GateError::Tracker)?;
            emit_issue_transitioned(&issue.key, transition_id, bucket);
        }
        Ok(())
    }

    async fn fail_back(
        &self,
        issues: &[Issue],
        transition_id: &str,
        comment: &str,
        bucket: &str,
    ) -> Result<()> {
        let transition = Transition {
            id: transition_id.to_string(),
            environment: None,
        };
        for issue in issues {
            self.tracker
                .transition(issue, &transition)
                .await
                .map_err(GateError::Tracker)?;
            emit_issue_transitioned(&issue.key, transition_id, bucket);
            self.tracker
                .add_comment(issue, comment)
                .await
                .map_err(GateError::Tracker)?;
            emit_issue_commented(&issue.key);
        }
        Ok(())
    }
}

/// Branches of every issue at the test or release gate, whatever its
/// resolution, in first-seen order. Issues without a branch are skipped.
pub async fn waiting_branches(
    tracker: &dyn IssueTracker,
    workflow: &WorkflowSettings,
) -> Result<CandidateSet> {
    let mut branches = CandidateSet::new();
    for status in [&workflow.test_status, &workflow.release_status] {
        let issues = tracker
            .query(&IssueQuery::at_gate(status))
            .await
            .map_err(GateError::Tracker)?;
        for issue in issues {
            if let Some(branch) = issue.branch {
                branches.insert(branch);
            }
        }
    }
    tracing::debug!(count = branches.len(), "collected waiting branches");
    Ok(branches)
}
