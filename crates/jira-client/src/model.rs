//! Jira REST v2 wire types.

use branchgate_core::{BranchKey, Issue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One page of `GET /rest/api/2/search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    #[serde(default)]
    pub start_at: usize,
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub issues: Vec<IssueDto>,
}

/// Issue as returned by search; `fields` holds only the requested fields.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueDto {
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl IssueDto {
    /// Convert, reading the branch from `customfield_<branch_field>`.
    pub fn into_issue(self, branch_field: u32) -> Issue {
        let name_of = |field: &str| {
            self.fields
                .get(field)
                .and_then(|v| v.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let branch = self
            .fields
            .get(&custom_field_name(branch_field))
            .and_then(field_text)
            .and_then(BranchKey::normalize);
        Issue {
            status: name_of("status"),
            resolution: name_of("resolution"),
            branch,
            key: self.key,
        }
    }
}

/// Text of a custom field that is either a plain string or a select option.
fn field_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(obj) => obj.get("value").and_then(Value::as_str),
        _ => None,
    }
}

pub fn custom_field_name(id: u32) -> String {
    format!("customfield_{}", id)
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentFields<'a> {
    pub environment: &'a str,
}

/// Body of `POST /rest/api/2/issue/<key>/transitions`.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRequest<'a> {
    pub transition: TransitionRef<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<EnvironmentFields<'a>>,
}

/// Body of `POST /rest/api/2/issue/<key>/comment`.
#[derive(Debug, Clone, Serialize)]
pub struct CommentRequest<'a> {
    pub body: &'a str,
}
