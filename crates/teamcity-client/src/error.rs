//! Error types for teamcity-client

use branchgate_core::RemoteError;
use thiserror::Error;

/// Errors talking to a TeamCity server
#[derive(Error, Debug)]
pub enum TeamCityError {
    /// Request could not be sent or no response was read
    #[error("HTTP error: {0}")]
    Http(String),

    /// TeamCity answered with a non-success status
    #[error("TeamCity returned wrong status: {status} {description}\n{body}")]
    Status {
        status: u16,
        description: String,
        body: String,
    },

    /// Response body is not the JSON we expect
    #[error("JSON decoding error: {0}")]
    Decode(String),

    /// The HTTP client could not be built from the configuration
    #[error("invalid TeamCity client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for TeamCityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TeamCityError::Decode(err.to_string())
        } else {
            TeamCityError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TeamCityError {
    fn from(err: serde_json::Error) -> Self {
        TeamCityError::Decode(err.to_string())
    }
}

impl From<TeamCityError> for RemoteError {
    fn from(err: TeamCityError) -> Self {
        match err {
            TeamCityError::Status {
                status,
                description,
                body,
            } => RemoteError::Status {
                status,
                description,
                body,
            },
            TeamCityError::Decode(msg) => RemoteError::Decode(msg),
            TeamCityError::Http(msg) | TeamCityError::Config(msg) => RemoteError::Transport(msg),
        }
    }
}
