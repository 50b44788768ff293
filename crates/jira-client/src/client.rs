//! Jira REST v2 client.
//!
//! Searches are paged until Jira's reported `total` has been read.
//! A non-success status is an error carrying the status line and body.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::debug;

use branchgate_core::{Issue, IssueQuery, IssueTracker, RemoteResult, Transition};

use crate::error::JiraError;
use crate::jql;
use crate::model::{
    custom_field_name, CommentRequest, EnvironmentFields, SearchPage, TransitionRef,
    TransitionRequest,
};
use crate::Result;

/// Page size requested from the search endpoint.
pub const PAGE_SIZE: usize = 100;

/// Custom field id that holds the branch in the default setup.
pub const DEFAULT_BRANCH_FIELD: u32 = 11104;

/// Connection settings of one Jira instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    /// Project every query is restricted to
    pub project_key: String,
    /// Numeric id of the custom field holding the branch
    pub branch_field: u32,
}

impl JiraConfig {
    pub fn new(url: &str, user: &str, password: &str, project_key: &str) -> Self {
        JiraConfig {
            url: url.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            project_key: project_key.to_string(),
            branch_field: DEFAULT_BRANCH_FIELD,
        }
    }

    pub fn with_branch_field(mut self, field: u32) -> Self {
        self.branch_field = field;
        self
    }
}

/// Client for one Jira instance
pub struct JiraClient {
    config: JiraConfig,
    http_client: reqwest::Client,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("branchgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| JiraError::Config(e.to_string()))?;

        Ok(JiraClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &JiraConfig {
        &self.config
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/rest/api/2/{}",
            self.config.url.trim_end_matches('/'),
            resource
        )
    }

    /// Body of a successful response, or a status error.
    async fn checked(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(JiraError::Status {
                status: status.as_u16(),
                description: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }
        Ok(body)
    }

    async fn post<B: Serialize>(&self, resource: &str, body: &B) -> Result<()> {
        let url = self.endpoint(resource);
        debug!(url = %url, "POST");
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    /// All issues matching a JQL query, across pages.
    pub async fn search(&self, jql: &str) -> Result<Vec<Issue>> {
        let url = self.endpoint("search");
        let fields = format!(
            "status,resolution,{}",
            custom_field_name(self.config.branch_field)
        );
        let mut issues = Vec::new();
        let mut start_at = 0;

        loop {
            debug!(jql = %jql, start_at, "searching issues");
            let response = self
                .http_client
                .get(&url)
                .basic_auth(&self.config.user, Some(&self.config.password))
                .header(ACCEPT, "application/json")
                .query(&[
                    ("jql", jql.to_string()),
                    ("fields", fields.clone()),
                    ("startAt", start_at.to_string()),
                    ("maxResults", PAGE_SIZE.to_string()),
                ])
                .send()
                .await?;
            let body = Self::checked(response).await?;
            let page: SearchPage = serde_json::from_str(&body)?;

            let received = page.issues.len();
            issues.extend(
                page.issues
                    .into_iter()
                    .map(|dto| dto.into_issue(self.config.branch_field)),
            );
            start_at = page.start_at + received;

            if received == 0 || start_at >= page.total {
                break;
            }
        }

        Ok(issues)
    }

    /// Issues matching a gate predicate in the configured project.
    pub async fn find(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let jql = jql::render(&self.config.project_key, self.config.branch_field, query);
        self.search(&jql).await
    }

    pub async fn apply_transition(&self, issue_key: &str, transition: &Transition) -> Result<()> {
        let body = TransitionRequest {
            transition: TransitionRef { id: &transition.id },
            fields: transition
                .environment
                .as_deref()
                .map(|environment| EnvironmentFields { environment }),
        };
        self.post(&format!("issue/{}/transitions", issue_key), &body)
            .await
    }

    pub async fn comment(&self, issue_key: &str, body: &str) -> Result<()> {
        self.post(
            &format!("issue/{}/comment", issue_key),
            &CommentRequest { body },
        )
        .await
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn query(&self, query: &IssueQuery) -> RemoteResult<Vec<Issue>> {
        Ok(self.find(query).await?)
    }

    async fn transition(&self, issue: &Issue, transition: &Transition) -> RemoteResult<()> {
        Ok(self.apply_transition(&issue.key, transition).await?)
    }

    async fn add_comment(&self, issue: &Issue, body: &str) -> RemoteResult<()> {
        Ok(self.comment(&issue.key, body).await?)
    }
}
