//! TeamCity backend for Branchgate
//!
//! Implements `branchgate_core::BuildServer` over the TeamCity REST API:
//! running and queued builds, build history per branch, build detail,
//! changes since a given change, and adding builds to the queue.

mod client;
mod error;
pub mod model;

pub use client::{TeamCityClient, TeamCityConfig};
pub use error::TeamCityError;

/// Result type for teamcity-client operations
pub type Result<T> = std::result::Result<T, TeamCityError>;
