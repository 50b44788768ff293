//! Error types for branchgate-core

use thiserror::Error;

/// Failure of a single call to a remote collaborator (tracker or build server).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network or protocol level failure; no usable response was received
    #[error("transport level error: {0}")]
    Transport(String),

    /// The service answered with a non-success status
    #[error("returned wrong status: {status} {description}\n{body}")]
    Status {
        status: u16,
        description: String,
        body: String,
    },

    /// The response body could not be decoded
    #[error("unexpected response body: {0}")]
    Decode(String),
}

/// Result type for collaborator calls
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Errors that abort a branchgate invocation.
#[derive(Error, Debug)]
pub enum GateError {
    /// No settings section for a whole kind of collaborator
    #[error("no settings found for {section}")]
    ConfigurationMissing { section: String },

    /// A named instance was requested but is not configured
    #[error("unknown {kind} instance: {name}")]
    UnknownInstance { kind: &'static str, name: String },

    /// Malformed or contradictory invocation parameters
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The issue tracker call failed
    #[error("issue tracker: {0}")]
    Tracker(#[source] RemoteError),

    /// The build server call failed
    #[error("build server: {0}")]
    BuildServer(#[source] RemoteError),
}

/// Result type for branchgate operations
pub type Result<T> = std::result::Result<T, GateError>;
