//! Top-level control paths of one invocation.
//!
//! * `type=build`: wait for upstream systems to settle, collect candidate
//!   branches (the named one, or every branch waiting at a tracker gate),
//!   filter them and enqueue what is left.
//! * `type=unit` / `type=smoke`: read the outcome of a build on the check
//!   server. A successful check chains the next build for the named branch;
//!   tracker sync (when enabled) reports failures, and smoke checks always.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::collaborators::{BuildServer, IssueTracker};
use crate::eligibility::{self, CandidateSet, EligibilityRules};
use crate::enqueue;
use crate::error::{GateError, Result};
use crate::obs::{emit_run_finished, emit_run_started, run_span};
use crate::outcome;
use crate::params::{Invocation, OperationType};
use crate::sync::{
    waiting_branches, IssueStatusSynchronizer, SyncReport, SyncRequest, WorkflowSettings,
};

/// Default pause before the build path reads remote state.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Everything the orchestrator needs besides the collaborators.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub settle_delay: Duration,
    /// Environment URL template containing `{domain}`
    pub branch_url_template: String,
    /// Rules of the build server builds are started on
    pub rules: EligibilityRules,
    pub workflow: WorkflowSettings,
}

/// What one invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: String,
    /// Branches left after eligibility filtering
    pub eligible: Vec<String>,
    pub enqueued: usize,
    /// Failure reason of the checked build, for unit/smoke runs
    pub failure_reason: Option<String>,
    pub sync: Option<SyncReport>,
}

pub struct Orchestrator {
    tracker: Arc<dyn IssueTracker>,
    build_server: Arc<dyn BuildServer>,
    check_server: Option<Arc<dyn BuildServer>>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// `build_server` is the instance builds are started on (`on=`).
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        build_server: Arc<dyn BuildServer>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            tracker,
            build_server,
            check_server: None,
            settings,
        }
    }

    /// Instance the checked build lives on (`checkon=`).
    pub fn with_check_server(mut self, server: Arc<dyn BuildServer>) -> Self {
        self.check_server = Some(server);
        self
    }

    pub async fn run(&self, invocation: &Invocation) -> Result<RunReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = run_span(&run_id, invocation.operation);
        let started = Instant::now();

        let result = async {
            emit_run_started(&run_id, invocation.operation, &invocation.build_type);
            let mut report = match invocation.operation {
                OperationType::Build => self.run_build(invocation).await?,
                OperationType::Unit | OperationType::Smoke => self.run_check(invocation).await?,
            };
            report.run_id = run_id.clone();
            Ok::<RunReport, GateError>(report)
        }
        .instrument(span.clone())
        .await;

        let _entered = span.enter();
        let enqueued = result.as_ref().map(|r| r.enqueued).unwrap_or(0);
        emit_run_finished(
            &run_id,
            started.elapsed().as_millis() as u64,
            enqueued,
            result.is_ok(),
        );
        result
    }

    async fn run_build(&self, invocation: &Invocation) -> Result<RunReport> {
        if invocation.start_suppressed() {
            tracing::info!(
                operation = %invocation.operation,
                "operation is listed in notstartbuilds, not starting builds"
            );
            return Ok(RunReport::default());
        }

        tokio::time::sleep(self.settings.settle_delay).await;

        let candidates = match &invocation.branch {
            Some(branch) => std::iter::once(branch.clone()).collect(),
            None => waiting_branches(self.tracker.as_ref(), &self.settings.workflow).await?,
        };
        self.start_builds(candidates, invocation).await
    }

    async fn run_check(&self, invocation: &Invocation) -> Result<RunReport> {
        let (Some(branch), Some(build_id)) = (&invocation.branch, invocation.check_build_id)
        else {
            return Err(GateError::InvalidParameter(format!(
                "type={} requires branch and checkbuildid",
                invocation.operation
            )));
        };
        let check_server = self.check_server.as_ref().ok_or_else(|| {
            GateError::InvalidParameter(format!(
                "type={} requires a checkon build server",
                invocation.operation
            ))
        })?;

        let failure_reason = outcome::evaluate(check_server.as_ref(), build_id).await?;

        let mut report = if failure_reason.is_none() && !invocation.start_suppressed() {
            let candidates = std::iter::once(branch.clone()).collect();
            self.start_builds(candidates, invocation).await?
        } else {
            RunReport::default()
        };

        let smoke = invocation.operation == OperationType::Smoke;
        if invocation.tracker_sync.enabled() && (failure_reason.is_some() || smoke) {
            let branch_url = invocation.branch_url(&self.settings.branch_url_template);
            let synchronizer =
                IssueStatusSynchronizer::new(self.tracker.as_ref(), &self.settings.workflow);
            let sync = synchronizer
                .synchronize(&SyncRequest {
                    branch,
                    failure_reason: failure_reason.as_deref(),
                    branch_url: branch_url.as_deref(),
                    build_server_url: check_server.display_url(),
                    build_id,
                })
                .await?;
            report.sync = Some(sync);
        }

        report.failure_reason = failure_reason;
        Ok(report)
    }

    async fn start_builds(
        &self,
        candidates: CandidateSet,
        invocation: &Invocation,
    ) -> Result<RunReport> {
        let server = self.build_server.as_ref();
        let eligible = eligibility::filter(
            server,
            candidates,
            &invocation.build_type,
            &self.settings.rules,
        )
        .await?;

        let parameters = invocation.build_parameters(&self.settings.branch_url_template);
        let enqueued = enqueue::enqueue(
            server,
            &eligible,
            &self.settings.rules.ignore_prefixes,
            &invocation.build_type,
            &parameters,
        )
        .await?;

        Ok(RunReport {
            eligible: eligible.iter().map(|b| b.to_string()).collect(),
            enqueued,
            ..RunReport::default()
        })
    }
}
