//! `branchgate.toml` settings.
//!
//! ```toml
//! settle_delay_secs = 5
//! branch_url_template = "http://{domain}.dev.example.com"
//!
//! [tracker.default]
//! url = "https://jira.example.com"
//! user = "robot"
//! password_env = "JIRA_PASSWORD"
//! project_key = "PROJ"
//! branch_field = 11104
//! test_status = "Ready for Test"
//! release_status = "Ready for Release"
//! default_environment_url = "http://dev.example.com"
//!
//! [tracker.default.transitions]
//! to_test = "71"
//! to_release = "81"
//! failed_test = "91"
//! failed_release = "101"
//!
//! [build_server.dev]
//! url = "https://teamcity.example.com"
//! user = "robot"
//! password = "secret"
//! display_url = "https://ci.example.com"
//! watched_build_types = ["Dev_Deploy"]
//! ignore_branch_prefixes = ["hotfix-"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use branchgate_core::{EligibilityRules, GateError, OrchestratorSettings, WorkflowSettings};
use jira_client::{JiraConfig, DEFAULT_BRANCH_FIELD};
use teamcity_client::TeamCityConfig;

/// Tracker instance every invocation uses.
pub const DEFAULT_TRACKER: &str = "default";

fn default_settle_delay_secs() -> u64 {
    5
}

fn default_branch_url_template() -> String {
    "http://{domain}".to_string()
}

fn default_branch_field() -> u32 {
    DEFAULT_BRANCH_FIELD
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
    #[serde(default = "default_branch_url_template")]
    pub branch_url_template: String,
    pub tracker: Option<BTreeMap<String, TrackerSettings>>,
    pub build_server: Option<BTreeMap<String, BuildServerSettings>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerSettings {
    pub url: String,
    pub user: String,
    pub password: Option<String>,
    /// Environment variable holding the password
    pub password_env: Option<String>,
    pub project_key: String,
    #[serde(default = "default_branch_field")]
    pub branch_field: u32,
    #[serde(flatten)]
    pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildServerSettings {
    pub url: String,
    pub user: String,
    pub password: Option<String>,
    pub password_env: Option<String>,
    /// Link base for builds; defaults to `url`
    pub display_url: Option<String>,
    #[serde(default)]
    pub watched_build_types: Vec<String>,
    #[serde(default)]
    pub ignore_branch_prefixes: Vec<String>,
}

/// Result of looking an instance up by name.
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Found(&'a T),
    NotFound(String),
}

impl<'a, T> Lookup<'a, T> {
    /// The instance, or `UnknownInstance` naming what was asked for.
    pub fn require(self, kind: &'static str) -> std::result::Result<&'a T, GateError> {
        match self {
            Lookup::Found(value) => Ok(value),
            Lookup::NotFound(name) => Err(GateError::UnknownInstance { kind, name }),
        }
    }
}

fn lookup<'a, T>(
    section: &str,
    table: &'a Option<BTreeMap<String, T>>,
    name: &str,
) -> std::result::Result<Lookup<'a, T>, GateError> {
    let table = table.as_ref().ok_or_else(|| GateError::ConfigurationMissing {
        section: section.to_string(),
    })?;
    Ok(match table.get(name) {
        Some(value) => Lookup::Found(value),
        None => Lookup::NotFound(name.to_string()),
    })
}

fn resolve_password(
    section: &str,
    password: &Option<String>,
    password_env: &Option<String>,
) -> std::result::Result<String, GateError> {
    if let Some(password) = password {
        return Ok(password.clone());
    }
    match password_env {
        Some(var) => std::env::var(var).map_err(|_| GateError::ConfigurationMissing {
            section: format!("{} password (environment variable {} is not set)", section, var),
        }),
        None => Err(GateError::ConfigurationMissing {
            section: format!("{} password", section),
        }),
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn tracker(
        &self,
        name: &str,
    ) -> std::result::Result<Lookup<'_, TrackerSettings>, GateError> {
        lookup("tracker", &self.tracker, name)
    }

    pub fn build_server(
        &self,
        name: &str,
    ) -> std::result::Result<Lookup<'_, BuildServerSettings>, GateError> {
        lookup("build_server", &self.build_server, name)
    }

    /// Orchestrator settings for builds started on `primary`.
    pub fn orchestrator_settings(
        &self,
        tracker: &TrackerSettings,
        primary: &BuildServerSettings,
    ) -> OrchestratorSettings {
        OrchestratorSettings {
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            branch_url_template: self.branch_url_template.clone(),
            rules: primary.rules(),
            workflow: tracker.workflow.clone(),
        }
    }
}

impl TrackerSettings {
    pub fn jira_config(&self) -> std::result::Result<JiraConfig, GateError> {
        let password = resolve_password("tracker", &self.password, &self.password_env)?;
        Ok(JiraConfig::new(&self.url, &self.user, &password, &self.project_key)
            .with_branch_field(self.branch_field))
    }
}

impl BuildServerSettings {
    pub fn teamcity_config(&self) -> std::result::Result<TeamCityConfig, GateError> {
        let password = resolve_password("build_server", &self.password, &self.password_env)?;
        let config = TeamCityConfig::new(&self.url, &self.user, &password);
        Ok(match &self.display_url {
            Some(display_url) => config.with_display_url(display_url),
            None => config,
        })
    }

    pub fn rules(&self) -> EligibilityRules {
        EligibilityRules {
            watched_build_types: self.watched_build_types.clone(),
            ignore_prefixes: self.ignore_branch_prefixes.clone(),
        }
    }
}
