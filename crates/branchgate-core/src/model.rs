//! Remote entities as the decision logic sees them.
//!
//! All of these are read-only snapshots fetched at the start of a decision;
//! nothing here is persisted or re-read after it has been acted upon.

use serde::{Deserialize, Serialize};

use crate::branch::BranchKey;

/// Numeric build identifier assigned by the build server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub u64);

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BuildId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(BuildId)
    }
}

/// Numeric change (commit) identifier assigned by the build server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(pub u64);

impl std::fmt::Display for ChangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Terminal status reported for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildStatus {
    Success,
    Failure,
    Error,
    /// Queued/running builds, or anything the server reports we do not model
    #[default]
    #[serde(other)]
    Unknown,
}

impl BuildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::Error => "ERROR",
            BuildStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build as returned by the build server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Build {
    pub id: BuildId,
    pub build_type_id: String,
    pub status: BuildStatus,
    /// Free-form status message, passed verbatim to tracker comments
    pub status_text: Option<String>,
    /// Raw branch name; `None` for builds of the default branch
    pub branch_name: Option<String>,
    /// Last change included in the build (only populated on build detail)
    pub last_change: Option<ChangeId>,
}

impl Build {
    /// Canonical branch this build ran on, if any.
    pub fn branch_key(&self) -> Option<BranchKey> {
        self.branch_name.as_deref().and_then(BranchKey::normalize)
    }

    pub fn is_success(&self) -> bool {
        self.status == BuildStatus::Success
    }
}

/// A change known to the build server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub id: ChangeId,
}

/// An issue as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Tracker key, e.g. `PROJ-123`
    pub key: String,
    pub status: Option<String>,
    pub resolution: Option<String>,
    /// Value of the custom field that associates the issue with a branch
    pub branch: Option<BranchKey>,
}
