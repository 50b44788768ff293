//! Putting eligible branches into the build queue.

use futures::future::join_all;

use crate::branch::BranchKey;
use crate::collaborators::{BuildServer, EnqueueRequest};
use crate::eligibility::CandidateSet;
use crate::error::{GateError, RemoteError, Result};
use crate::obs::{emit_branch_skipped, emit_build_enqueued, SkipReason};
use crate::params::BuildParameters;

/// Whether `branch` starts with any of `prefixes`. Prefixes are trimmed,
/// blank ones are ignored, comparison is case-sensitive.
pub fn is_ignored(branch: &BranchKey, prefixes: &[String]) -> bool {
    prefixes
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .any(|p| branch.starts_with(p))
}

/// Enqueue one build of `build_type` per candidate not matching an ignore
/// prefix. Returns how many builds were enqueued.
///
/// Calls run concurrently and a failing call does not cancel the others.
/// When any call fails, the first error (in candidate order) is returned
/// after all calls have completed.
pub async fn enqueue(
    server: &dyn BuildServer,
    candidates: &CandidateSet,
    ignore_prefixes: &[String],
    build_type: &str,
    parameters: &BuildParameters,
) -> Result<usize> {
    let requests: Vec<EnqueueRequest> = candidates
        .iter()
        .filter(|branch| {
            let ignored = is_ignored(branch, ignore_prefixes);
            if ignored {
                emit_branch_skipped(branch, SkipReason::Ignored, None);
            }
            !ignored
        })
        .map(|branch| EnqueueRequest {
            build_type: build_type.to_string(),
            branch: branch.clone(),
            properties: parameters.clone(),
        })
        .collect();

    let results = join_all(requests.iter().map(|request| async move {
        server.enqueue(request).await?;
        emit_build_enqueued(&request.branch, &request.build_type);
        Ok::<(), RemoteError>(())
    }))
    .await;

    let mut enqueued = 0;
    let mut first_error = None;
    for result in results {
        match result {
            Ok(()) => enqueued += 1,
            Err(err) => {
                tracing::warn!(error = %err, "enqueue failed");
                first_error.get_or_insert(err);
            }
        }
    }

    match first_error {
        Some(err) => Err(GateError::BuildServer(err)),
        None => Ok(enqueued),
    }
}
