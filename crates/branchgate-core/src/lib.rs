//! Branchgate core: branch build orchestration and issue status sync
//!
//! Decides which branches to build on TeamCity and moves the matching Jira
//! issues through their test and release gates. All decisions are made
//! against two collaborator traits, so the logic here never touches HTTP.
//!
//! ## Key Components
//!
//! - `BranchKey`: canonical branch identity shared by both services
//! - `Invocation`: validated `key=value` invocation parameters
//! - `eligibility::filter`: drops running, queued and up-to-date branches
//! - `enqueue::enqueue`: queues builds for the remaining branches
//! - `outcome::evaluate`: reads the result of a finished build
//! - `IssueStatusSynchronizer`: applies the gate transitions
//! - `Orchestrator`: the `build` and `unit`/`smoke` control paths

pub mod branch;
pub mod collaborators;
pub mod eligibility;
pub mod enqueue;
mod error;
pub mod fakes;
pub mod model;
pub mod obs;
pub mod orchestrator;
pub mod outcome;
pub mod params;
pub mod sync;
pub mod telemetry;

pub use branch::BranchKey;
pub use collaborators::{
    BuildLocator, BuildServer, ChangeLocator, EnqueueRequest, IssueQuery, IssueTracker,
    ResolutionFilter, Transition,
};
pub use eligibility::{CandidateSet, EligibilityRules};
pub use error::{GateError, RemoteError, RemoteResult, Result};
pub use model::{Build, BuildId, BuildStatus, Change, ChangeId, Issue};
pub use orchestrator::{Orchestrator, OrchestratorSettings, RunReport, DEFAULT_SETTLE_DELAY};
pub use params::{BuildParameters, Invocation, OperationType, TrackerSync, PROPERTY_PREFIX};
pub use sync::{
    IssueStatusSynchronizer, SyncReport, SyncRequest, TransitionIds, WorkflowSettings,
};
pub use telemetry::init_tracing;
