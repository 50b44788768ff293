//! Invocation parameters and the build property bag.
//!
//! The command line is a list of `key=value` tokens, e.g.
//!
//! ```text
//! type=unit on=dev buildtype=Dev_Unit branch=fn-100 domain=fn-100
//! checkon=dev checkbuildid=42 jira=true
//! ```
//!
//! [`Invocation::parse`] validates them once; the orchestrator consumes the
//! result as already-validated input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::branch::BranchKey;
use crate::error::{GateError, Result};
use crate::model::BuildId;

/// Namespace put in front of every enqueued build property.
pub const PROPERTY_PREFIX: &str = "env.branchgate.";

/// Which pass this invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Start builds for waiting branches
    Build,
    /// Check a deploy build, then chain the unit-test build
    Unit,
    /// Check a build, then chain the smoke build; always syncs the tracker
    Smoke,
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Build => write!(f, "build"),
            OperationType::Unit => write!(f, "unit"),
            OperationType::Smoke => write!(f, "smoke"),
        }
    }
}

impl std::str::FromStr for OperationType {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "build" => Ok(OperationType::Build),
            "unit" => Ok(OperationType::Unit),
            "smoke" => Ok(OperationType::Smoke),
            other => Err(GateError::InvalidParameter(format!(
                "unknown operation type: {}",
                other
            ))),
        }
    }
}

/// Whether the check pass may move issues in the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerSync {
    Always,
    Never,
    /// Not given on the command line; behaves as `Never`
    #[default]
    Unset,
}

impl TrackerSync {
    pub fn enabled(self) -> bool {
        matches!(self, TrackerSync::Always)
    }

    /// Value echoed into the build properties; `None` when unset.
    fn as_property(self) -> Option<&'static str> {
        match self {
            TrackerSync::Always => Some("true"),
            TrackerSync::Never => Some("false"),
            TrackerSync::Unset => None,
        }
    }

    fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(TrackerSync::Unset);
        }
        if value.eq_ignore_ascii_case("true") {
            Ok(TrackerSync::Always)
        } else if value.eq_ignore_ascii_case("false") {
            Ok(TrackerSync::Never)
        } else {
            Err(GateError::InvalidParameter(format!(
                "jira must be true or false, got '{}'",
                value
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// BuildParameters
// ---------------------------------------------------------------------------

/// Named properties passed opaquely to an enqueued build.
///
/// Keys are unique; inserting an existing key replaces its value. Entries with
/// an empty key or value are dropped on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParameters {
    entries: BTreeMap<String, String>,
}

impl BuildParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property. Returns `self` for chaining.
    pub fn with(mut self, key: &str, value: Option<&str>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: Option<&str>) {
        match value {
            Some(value) if !key.is_empty() && !value.is_empty() => {
                self.entries.insert(key.to_string(), value.to_string());
            }
            _ => {}
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Properties with their namespaced wire names (`env.branchgate.<key>`).
    pub fn namespaced(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.entries
            .iter()
            .map(|(k, v)| (format!("{}{}", PROPERTY_PREFIX, k), v.as_str()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Validated invocation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub operation: OperationType,
    /// Build server instance builds are started on
    pub on: String,
    /// Build configuration to start
    pub build_type: String,
    /// Explicit branch; when absent the build pass asks the tracker
    pub branch: Option<BranchKey>,
    /// Environment domain derived from the `domain` token
    pub domain: Option<BranchKey>,
    /// Build server instance the checked build lives on
    pub check_on: Option<String>,
    pub check_build_id: Option<BuildId>,
    pub tracker_sync: TrackerSync,
    /// Operation types that must not start builds
    pub not_start: Vec<OperationType>,
    /// `notstartbuilds` exactly as given, echoed into build properties
    not_start_raw: String,
}

impl Invocation {
    /// Parse `key=value` tokens. Keys are case-insensitive, unknown keys are
    /// ignored, a token without exactly one `=` is rejected.
    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut operation = None;
        let mut on = None;
        let mut build_type = None;
        let mut branch = None;
        let mut domain = None;
        let mut check_on = None;
        let mut check_build_id = None;
        let mut tracker_sync = TrackerSync::Unset;
        let mut not_start = Vec::new();
        let mut not_start_raw = String::new();

        for arg in args {
            let arg = arg.as_ref();
            let parts: Vec<&str> = arg.split('=').collect();
            if parts.len() != 2 {
                return Err(GateError::InvalidParameter(format!(
                    "'{}' must be given as 'key=value[,value...]'",
                    arg
                )));
            }
            let key = parts[0].to_lowercase();
            let value = parts[1];

            match key.as_str() {
                "type" => operation = Some(value.parse::<OperationType>()?),
                "on" => on = non_empty(value),
                "buildtype" => build_type = non_empty(value),
                "branch" => branch = BranchKey::normalize(value),
                "domain" => domain = BranchKey::normalize_for_display(value),
                "checkon" => check_on = non_empty(value),
                "checkbuildid" => {
                    check_build_id = match non_empty(value) {
                        Some(id) => Some(id.parse::<BuildId>().map_err(|_| {
                            GateError::InvalidParameter(format!(
                                "checkbuildid must be numeric, got '{}'",
                                id
                            ))
                        })?),
                        None => None,
                    }
                }
                "jira" => tracker_sync = TrackerSync::parse(value)?,
                "notstartbuilds" => {
                    not_start_raw = value.to_string();
                    not_start = value
                        .split(',')
                        .filter(|v| !v.trim().is_empty())
                        .map(str::parse::<OperationType>)
                        .collect::<Result<Vec<_>>>()?;
                }
                _ => {}
            }
        }

        let (Some(operation), Some(on), Some(build_type)) = (operation, on, build_type) else {
            return Err(GateError::InvalidParameter(
                "type, on and buildtype must always be given".to_string(),
            ));
        };

        if operation != OperationType::Build
            && (branch.is_none()
                || domain.is_none()
                || check_on.is_none()
                || check_build_id.is_none())
        {
            return Err(GateError::InvalidParameter(format!(
                "type={} requires branch, domain, checkon and checkbuildid",
                operation
            )));
        }

        Ok(Self {
            operation,
            on,
            build_type,
            branch,
            domain,
            check_on,
            check_build_id,
            tracker_sync,
            not_start,
            not_start_raw,
        })
    }

    /// Whether this operation type is listed in `notstartbuilds`.
    pub fn start_suppressed(&self) -> bool {
        self.not_start.contains(&self.operation)
    }

    /// Environment URL for the domain, from a template containing `{domain}`.
    pub fn branch_url(&self, template: &str) -> Option<String> {
        self.domain
            .as_ref()
            .map(|domain| template.replace("{domain}", domain.as_str()))
    }

    /// Property bag carried by every build this invocation enqueues, so the
    /// started build can call back with the same settings.
    pub fn build_parameters(&self, branch_url_template: &str) -> BuildParameters {
        BuildParameters::new()
            .with("branchurl", self.branch_url(branch_url_template).as_deref())
            .with("domain", self.domain.as_ref().map(BranchKey::as_str))
            .with("jira", self.tracker_sync.as_property())
            .with("notstartbuilds", Some(&self.not_start_raw))
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "http://{domain}.dev.example.com";

    fn check_args() -> Vec<&'static str> {
        vec![
            "type=unit",
            "on=dev",
            "buildtype=Dev_Unit",
            "branch=refs/heads/feature/Dev-FN-1234.landing",
            "domain=refs/heads/feature/Dev-FN-1234.landing",
            "checkon=ci",
            "checkbuildid=4711",
            "jira=true",
        ]
    }

    #[test]
    fn test_parse_build_invocation_minimal() {
        let inv = Invocation::parse(["type=build", "on=dev", "buildtype=Dev_Deploy"]).unwrap();
        assert_eq!(inv.operation, OperationType::Build);
        assert_eq!(inv.on, "dev");
        assert_eq!(inv.build_type, "Dev_Deploy");
        assert!(inv.branch.is_none());
        assert_eq!(inv.tracker_sync, TrackerSync::Unset);
        assert!(!inv.start_suppressed());
    }

    #[test]
    fn test_parse_check_invocation() {
        let inv = Invocation::parse(check_args()).unwrap();
        assert_eq!(inv.operation, OperationType::Unit);
        assert_eq!(
            inv.branch.as_ref().unwrap().as_str(),
            "feature/Dev-FN-1234.landing"
        );
        assert_eq!(inv.domain.as_ref().unwrap().as_str(), "dev-fn-1234.landing");
        assert_eq!(inv.check_build_id, Some(BuildId(4711)));
        assert_eq!(inv.tracker_sync, TrackerSync::Always);
        assert_eq!(
            inv.branch_url(TEMPLATE).as_deref(),
            Some("http://dev-fn-1234.landing.dev.example.com")
        );
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let inv = Invocation::parse(["TYPE=build", "On=dev", "BuildType=X"]).unwrap();
        assert_eq!(inv.build_type, "X");
    }

    #[test]
    fn test_token_without_single_equals_is_rejected() {
        let err = Invocation::parse(["type=build", "on"]).unwrap_err();
        assert!(matches!(err, GateError::InvalidParameter(_)));
        let err = Invocation::parse(["type=build", "on=a=b"]).unwrap_err();
        assert!(matches!(err, GateError::InvalidParameter(_)));
    }

    #[test]
    fn test_missing_required_keys_is_rejected() {
        let err = Invocation::parse(["type=build", "on=dev"]).unwrap_err();
        assert!(err.to_string().contains("buildtype"));
    }

    #[test]
    fn test_check_invocation_requires_check_target() {
        let args: Vec<&str> = check_args()
            .into_iter()
            .filter(|a| !a.starts_with("checkbuildid"))
            .collect();
        let err = Invocation::parse(args).unwrap_err();
        assert!(err.to_string().contains("checkbuildid"));
    }

    #[test]
    fn test_unknown_operation_type_is_rejected() {
        let err = Invocation::parse(["type=deploy", "on=dev", "buildtype=X"]).unwrap_err();
        assert!(err.to_string().contains("deploy"));
    }

    #[test]
    fn test_non_numeric_build_id_is_rejected() {
        let mut args = check_args();
        args[6] = "checkbuildid=latest";
        assert!(Invocation::parse(args).is_err());
    }

    #[test]
    fn test_jira_flag_three_states() {
        let parse = |v: &str| {
            Invocation::parse(["type=build", "on=dev", "buildtype=X", v])
                .unwrap()
                .tracker_sync
        };
        assert_eq!(parse("jira=True"), TrackerSync::Always);
        assert_eq!(parse("jira=false"), TrackerSync::Never);
        assert_eq!(parse("jira="), TrackerSync::Unset);
        assert!(!TrackerSync::Unset.enabled());
        assert!(!TrackerSync::Never.enabled());
    }

    #[test]
    fn test_not_start_builds_suppresses_own_type() {
        let inv = Invocation::parse([
            "type=build",
            "on=dev",
            "buildtype=X",
            "notstartbuilds=build,,smoke",
        ])
        .unwrap();
        assert_eq!(
            inv.not_start,
            vec![OperationType::Build, OperationType::Smoke]
        );
        assert!(inv.start_suppressed());
    }

    #[test]
    fn test_build_parameters_drop_empty_values() {
        let params = BuildParameters::new()
            .with("domain", Some("fn-1"))
            .with("jira", None)
            .with("notstartbuilds", Some(""))
            .with("", Some("orphan"));
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("domain"), Some("fn-1"));
    }

    #[test]
    fn test_build_parameters_are_namespaced() {
        let params = BuildParameters::new().with("domain", Some("fn-1"));
        let wire: Vec<(String, &str)> = params.namespaced().collect();
        assert_eq!(wire, vec![("env.branchgate.domain".to_string(), "fn-1")]);
    }

    #[test]
    fn test_invocation_build_parameters_echo_settings() {
        let mut args = check_args();
        args.push("notstartbuilds=smoke");
        let inv = Invocation::parse(args).unwrap();
        let params = inv.build_parameters(TEMPLATE);
        assert_eq!(
            params.get("branchurl"),
            Some("http://dev-fn-1234.landing.dev.example.com")
        );
        assert_eq!(params.get("domain"), Some("dev-fn-1234.landing"));
        assert_eq!(params.get("jira"), Some("true"));
        assert_eq!(params.get("notstartbuilds"), Some("smoke"));
    }
}
