//! Jira backend for Branchgate
//!
//! Implements `branchgate_core::IssueTracker` over the Jira REST API v2.
//! Gate predicates are rendered to JQL in [`jql`]; the branch of an issue is
//! read from a configurable custom field.

mod client;
mod error;
pub mod jql;
pub mod model;

pub use client::{JiraClient, JiraConfig, DEFAULT_BRANCH_FIELD, PAGE_SIZE};
pub use error::JiraError;

/// Result type for jira-client operations
pub type Result<T> = std::result::Result<T, JiraError>;
