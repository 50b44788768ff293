//! Error types for jira-client

use branchgate_core::RemoteError;
use thiserror::Error;

/// Errors talking to a Jira server
#[derive(Error, Debug)]
pub enum JiraError {
    /// Request could not be sent or no response was read
    #[error("HTTP error: {0}")]
    Http(String),

    /// Jira answered with a non-success status
    #[error("Jira returned wrong status: {status} {description}\n{body}")]
    Status {
        status: u16,
        description: String,
        body: String,
    },

    /// Response body is not the JSON we expect
    #[error("JSON decoding error: {0}")]
    Decode(String),

    /// The HTTP client could not be built from the configuration
    #[error("invalid Jira client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for JiraError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            JiraError::Decode(err.to_string())
        } else {
            JiraError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for JiraError {
    fn from(err: serde_json::Error) -> Self {
        JiraError::Decode(err.to_string())
    }
}

impl From<JiraError> for RemoteError {
    fn from(err: JiraError) -> Self {
        match err {
            JiraError::Status {
                status,
                description,
                body,
            } => RemoteError::Status {
                status,
                description,
                body,
            },
            JiraError::Decode(msg) => RemoteError::Decode(msg),
            JiraError::Http(msg) | JiraError::Config(msg) => RemoteError::Transport(msg),
        }
    }
}
