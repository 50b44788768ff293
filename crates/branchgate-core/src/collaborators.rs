//! Collaborator trait definitions for Branchgate
//!
//! The decision logic talks to exactly two remote services:
//! - `BuildServer`: list/inspect builds and changes, enqueue new builds
//! - `IssueTracker`: query issues by gate predicate, transition, comment
//!
//! Both traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::branch::BranchKey;
use crate::error::RemoteResult;
use crate::model::{Build, BuildId, Change, ChangeId, Issue};
use crate::params::BuildParameters;

// ---------------------------------------------------------------------------
// BuildServer
// ---------------------------------------------------------------------------

/// Filter for listing builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildLocator {
    /// Builds currently running, on any branch
    Running,
    /// Finished builds of one build configuration on one branch
    Branch {
        branch: BranchKey,
        build_type: String,
    },
}

/// Filter for listing changes of one build configuration on one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLocator {
    pub branch: BranchKey,
    pub build_type: String,
    /// Only changes newer than this one
    pub since: Option<ChangeId>,
}

/// A request to put one branch into the build queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueRequest {
    pub build_type: String,
    pub branch: BranchKey,
    pub properties: BuildParameters,
}

/// The build server (TeamCity) as seen by the decision logic.
///
/// Any transport failure or non-success response is returned as an error;
/// implementations never retry.
#[async_trait]
pub trait BuildServer: Send + Sync {
    /// List builds matching a locator. Order is not guaranteed.
    async fn list_builds(&self, locator: &BuildLocator) -> RemoteResult<Vec<Build>>;

    /// List builds waiting in the queue.
    async fn queued_builds(&self) -> RemoteResult<Vec<Build>>;

    /// Fetch one build with its detail (status text, last change).
    async fn build(&self, id: BuildId) -> RemoteResult<Build>;

    /// List changes matching a locator.
    async fn list_changes(&self, locator: &ChangeLocator) -> RemoteResult<Vec<Change>>;

    /// Put a branch into the build queue.
    async fn enqueue(&self, request: &EnqueueRequest) -> RemoteResult<()>;

    /// Public base URL used when linking to a build from elsewhere.
    fn display_url(&self) -> &str;
}

// ---------------------------------------------------------------------------
// IssueTracker
// ---------------------------------------------------------------------------

/// Resolution predicate of an issue query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionFilter {
    /// Any resolution (or none)
    Any,
    /// Resolution = Fixed
    Fixed,
    /// Resolution != Fixed
    NotFixed,
}

/// Predicate selecting issues sitting at a gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    /// Workflow status name of the gate
    pub status: String,
    pub resolution: ResolutionFilter,
    /// Restrict to issues whose branch field equals this key
    pub branch: Option<BranchKey>,
}

impl IssueQuery {
    /// Every issue at the gate, whatever its resolution or branch.
    pub fn at_gate(status: &str) -> Self {
        Self {
            status: status.to_string(),
            resolution: ResolutionFilter::Any,
            branch: None,
        }
    }

    /// Issues at the gate resolved as Fixed on the given branch.
    pub fn fixed_on(status: &str, branch: &BranchKey) -> Self {
        Self {
            status: status.to_string(),
            resolution: ResolutionFilter::Fixed,
            branch: Some(branch.clone()),
        }
    }

    /// Issues at the gate not resolved as Fixed, on any branch.
    pub fn unresolved(status: &str) -> Self {
        Self {
            status: status.to_string(),
            resolution: ResolutionFilter::NotFixed,
            branch: None,
        }
    }
}

/// A workflow transition to apply to one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Tracker-side transition id
    pub id: String,
    /// Value for the issue's `environment` field, if the transition sets one
    pub environment: Option<String>,
}

/// The issue tracker (Jira) as seen by the decision logic.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Issues matching the predicate, in tracker order.
    async fn query(&self, query: &IssueQuery) -> RemoteResult<Vec<Issue>>;

    /// Apply a transition. Fails if the transition is not valid for the issue.
    async fn transition(&self, issue: &Issue, transition: &Transition) -> RemoteResult<()>;

    /// Add a comment to an issue.
    async fn add_comment(&self, issue: &Issue, body: &str) -> RemoteResult<()>;
}
