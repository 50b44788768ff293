//! Reading the outcome of a previously started build.

use crate::collaborators::BuildServer;
use crate::error::{GateError, Result};
use crate::model::BuildId;
use crate::obs::emit_build_failed;

/// `None` when the build succeeded, otherwise its failure reason.
///
/// The reason is the server's status text verbatim. When the server gives
/// no text, a reason naming the status is used so it is never empty.
pub async fn evaluate(server: &dyn BuildServer, id: BuildId) -> Result<Option<String>> {
    let build = server.build(id).await.map_err(GateError::BuildServer)?;

    if build.is_success() {
        tracing::info!(build_id = %id, "checked build succeeded");
        return Ok(None);
    }

    let reason = match build.status_text {
        Some(text) if !text.trim().is_empty() => text,
        _ => format!("build {} finished with status {}", id, build.status),
    };
    emit_build_failed(id, &reason);
    Ok(Some(reason))
}
