//! Candidate elimination before enqueueing.
//!
//! Three passes run in a fixed order, each narrowing the set the next one
//! sees: branches with a running watched build, branches with a queued
//! watched build, then branches whose last successful build already covers
//! every change. Each pass collects its removals first and applies them
//! afterwards.

use futures::future::try_join_all;
use std::collections::HashSet;

use crate::branch::BranchKey;
use crate::collaborators::{BuildLocator, BuildServer, ChangeLocator};
use crate::error::{GateError, RemoteResult, Result};
use crate::model::Build;
use crate::obs::{emit_branch_skipped, SkipReason};

// ---------------------------------------------------------------------------
// CandidateSet
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free set of branches considered for a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    branches: Vec<BranchKey>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a branch unless it is already present. Returns whether it was added.
    pub fn insert(&mut self, branch: BranchKey) -> bool {
        if self.branches.contains(&branch) {
            return false;
        }
        self.branches.push(branch);
        true
    }

    pub fn contains(&self, branch: &BranchKey) -> bool {
        self.branches.contains(branch)
    }

    /// Drop every branch in `removals`, keeping the order of the rest.
    pub fn remove_all(&mut self, removals: &HashSet<BranchKey>) {
        self.branches.retain(|b| !removals.contains(b));
    }

    pub fn iter(&self) -> impl Iterator<Item = &BranchKey> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn into_vec(self) -> Vec<BranchKey> {
        self.branches
    }
}

impl FromIterator<BranchKey> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = BranchKey>>(iter: I) -> Self {
        let mut set = CandidateSet::new();
        for branch in iter {
            set.insert(branch);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Per build-server instance rules for starting builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityRules {
    /// Build configurations whose running/queued builds block a branch.
    /// Empty means every configuration blocks.
    pub watched_build_types: Vec<String>,
    /// Branch name prefixes that are never enqueued
    pub ignore_prefixes: Vec<String>,
}

impl EligibilityRules {
    pub fn watches(&self, build_type_id: &str) -> bool {
        self.watched_build_types.is_empty()
            || self
                .watched_build_types
                .iter()
                .any(|t| t.trim() == build_type_id)
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Remove candidates that are already being built or have nothing new.
///
/// Any remote failure aborts the pass.
pub async fn filter(
    server: &dyn BuildServer,
    mut candidates: CandidateSet,
    build_type: &str,
    rules: &EligibilityRules,
) -> Result<CandidateSet> {
    let running = server
        .list_builds(&BuildLocator::Running)
        .await
        .map_err(GateError::BuildServer)?;
    let removals = blocked_by(&candidates, &running, rules, SkipReason::Running);
    candidates.remove_all(&removals);

    let queued = server
        .queued_builds()
        .await
        .map_err(GateError::BuildServer)?;
    let removals = blocked_by(&candidates, &queued, rules, SkipReason::Queued);
    candidates.remove_all(&removals);

    let checks = candidates
        .iter()
        .map(|branch| has_unbuilt_changes(server, build_type, branch));
    let verdicts = try_join_all(checks)
        .await
        .map_err(GateError::BuildServer)?;

    let removals: HashSet<BranchKey> = candidates
        .iter()
        .zip(verdicts)
        .filter(|(_, has_changes)| !has_changes)
        .map(|(branch, _)| {
            emit_branch_skipped(branch, SkipReason::NoChanges, Some(build_type));
            branch.clone()
        })
        .collect();
    candidates.remove_all(&removals);

    Ok(candidates)
}

/// Candidates with a build in `builds` of a watched configuration.
fn blocked_by(
    candidates: &CandidateSet,
    builds: &[Build],
    rules: &EligibilityRules,
    reason: SkipReason,
) -> HashSet<BranchKey> {
    let mut removals = HashSet::new();
    for build in builds {
        let Some(branch) = build.branch_key() else {
            continue;
        };
        if candidates.contains(&branch)
            && rules.watches(&build.build_type_id)
            && removals.insert(branch.clone())
        {
            emit_branch_skipped(&branch, reason, Some(&build.build_type_id));
        }
    }
    removals
}

/// Whether `branch` has changes not covered by its most recent successful
/// build of `build_type`.
///
/// "Most recent" is the success build with the highest id, regardless of
/// when it finished. A branch that never built successfully always has
/// unbuilt changes.
pub async fn has_unbuilt_changes(
    server: &dyn BuildServer,
    build_type: &str,
    branch: &BranchKey,
) -> RemoteResult<bool> {
    let history = server
        .list_builds(&BuildLocator::Branch {
            branch: branch.clone(),
            build_type: build_type.to_string(),
        })
        .await?;

    let Some(latest) = history
        .iter()
        .filter(|b| b.is_success())
        .max_by_key(|b| b.id)
    else {
        return Ok(true);
    };

    let detail = server.build(latest.id).await?;
    let changes = server
        .list_changes(&ChangeLocator {
            branch: branch.clone(),
            build_type: build_type.to_string(),
            since: detail.last_change,
        })
        .await?;

    tracing::debug!(
        branch = %branch,
        build_id = %latest.id,
        since = ?detail.last_change,
        changes = changes.len(),
        "checked changes since last successful build"
    );

    Ok(!changes.is_empty())
}
