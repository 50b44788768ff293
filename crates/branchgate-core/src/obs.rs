//! Structured progress events for a branchgate run.
//!
//! Every remote side effect and every candidate elimination is reported as an
//! `info!` event carrying an `event` field, so a JSON log can be filtered by
//! event name. All of them are emitted inside the run span from [`run_span`].

use tracing::info;

use crate::branch::BranchKey;
use crate::model::BuildId;
use crate::params::OperationType;

/// Why a candidate branch was not enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A watched build of the branch is running
    Running,
    /// A watched build of the branch is queued
    Queued,
    /// The last successful build already covers every change
    NoChanges,
    /// The branch matches an ignore prefix
    Ignored,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Running => "running",
            SkipReason::Queued => "queued",
            SkipReason::NoChanges => "no_changes",
            SkipReason::Ignored => "ignored",
        }
    }
}

/// Span covering one invocation, tagged with a fresh run id.
pub fn run_span(run_id: &str, operation: OperationType) -> tracing::Span {
    tracing::info_span!("branchgate.run", run_id = %run_id, operation = %operation)
}

pub fn emit_run_started(run_id: &str, operation: OperationType, build_type: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        operation = %operation,
        build_type = %build_type,
    );
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, enqueued: usize, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        enqueued = enqueued,
        success = success,
    );
}

/// Emit event: a candidate was eliminated.
pub fn emit_branch_skipped(branch: &BranchKey, reason: SkipReason, build_type: Option<&str>) {
    info!(
        event = "branch.skipped",
        branch = %branch,
        reason = reason.as_str(),
        build_type = build_type.unwrap_or(""),
    );
}

pub fn emit_build_enqueued(branch: &BranchKey, build_type: &str) {
    info!(event = "build.enqueued", branch = %branch, build_type = %build_type);
}

pub fn emit_issue_transitioned(issue_key: &str, transition_id: &str, bucket: &str) {
    info!(
        event = "issue.transitioned",
        issue = %issue_key,
        transition = %transition_id,
        bucket = %bucket,
    );
}

pub fn emit_issue_commented(issue_key: &str) {
    info!(event = "issue.commented", issue = %issue_key);
}

/// Emit event: per-bucket counts after a synchronization pass.
pub fn emit_sync_summary(
    branch: &BranchKey,
    branch_url: Option<&str>,
    failed: bool,
    counts: [usize; 4],
) {
    let [test_fixed, release_fixed, test_unresolved, release_unresolved] = counts;
    info!(
        event = "sync.summary",
        branch = %branch,
        branch_url = branch_url.unwrap_or(""),
        failed = failed,
        test_fixed = test_fixed,
        release_fixed = release_fixed,
        test_unresolved = test_unresolved,
        release_unresolved = release_unresolved,
    );
}

/// Emit event: a checked build did not succeed.
pub fn emit_build_failed(build_id: BuildId, reason: &str) {
    tracing::warn!(event = "build.failed", build_id = %build_id, reason = %reason);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("test-run-id", OperationType::Build);
        let _entered = span.enter();
    }

    #[test]
    fn test_skip_reason_names() {
        assert_eq!(SkipReason::NoChanges.as_str(), "no_changes");
        assert_eq!(SkipReason::Ignored.as_str(), "ignored");
    }
}
