//! TeamCity REST client.
//!
//! Every request goes to `<url>/httpAuth/app/rest/...` with basic auth and
//! asks for JSON. A non-success status is an error carrying the status line
//! and the body TeamCity sent; nothing is retried.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use branchgate_core::{
    Build, BuildId, BuildLocator, BuildServer, Change, ChangeLocator, EnqueueRequest,
    RemoteResult,
};

use crate::error::TeamCityError;
use crate::model::{BuildDto, BuildRequestDto, BuildTypeRef, BuildsDto, ChangesDto, PropertiesDto};
use crate::Result;

const REST_PREFIX: &str = "httpAuth/app/rest";

/// Connection settings of one TeamCity instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamCityConfig {
    /// Base URL the REST API is reached at
    pub url: String,
    pub user: String,
    pub password: String,
    /// Public URL used in links to builds; may differ from `url`
    pub display_url: String,
}

impl TeamCityConfig {
    pub fn new(url: &str, user: &str, password: &str) -> Self {
        TeamCityConfig {
            url: url.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            display_url: url.to_string(),
        }
    }

    pub fn with_display_url(mut self, display_url: &str) -> Self {
        self.display_url = display_url.to_string();
        self
    }
}

/// Client for one TeamCity instance
pub struct TeamCityClient {
    config: TeamCityConfig,
    http_client: reqwest::Client,
}

impl TeamCityClient {
    pub fn new(config: TeamCityConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("branchgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TeamCityError::Config(e.to_string()))?;

        Ok(TeamCityClient {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &TeamCityConfig {
        &self.config
    }

    fn endpoint(&self, resource: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.url.trim_end_matches('/'),
            REST_PREFIX,
            resource
        )
    }

    async fn get<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(resource);
        debug!(url = %url, query = ?query, "GET");
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.config.user, Some(&self.config.password))
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;
        let body = Self::checked(response).await?;
        Ok(serde_json::from_str(&body)?)
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

    /// Body of a successful response, or a status error.
    async fn checked(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TeamCityError::Status {
                status: status.as_u16(),
                description: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }
        Ok(body)
    }

    /// Builds matching a locator.
    pub async fn builds(&self, locator: &BuildLocator) -> Result<Vec<Build>> {
        let locator = match locator {
            BuildLocator::Running => "running:true,branch:default:any".to_string(),
            BuildLocator::Branch { branch, build_type } => {
                format!("branch:name:{},buildType:{}", branch, build_type)
            }
        };
        let builds: BuildsDto = self.get("builds/", &[("locator", locator)]).await?;
        Ok(builds.build.into_iter().map(Build::from).collect())
    }

    /// Builds waiting in the queue.
    pub async fn build_queue(&self) -> Result<Vec<Build>> {
        let builds: BuildsDto = self.get("buildQueue", &[]).await?;
        Ok(builds.build.into_iter().map(Build::from).collect())
    }

    /// One build with its last change.
    pub async fn build_detail(&self, id: BuildId) -> Result<Build> {
        let build: BuildDto = self.get(&format!("builds/id:{}", id), &[]).await?;
        Ok(build.into())
    }

    /// Changes of a build configuration on a branch.
    pub async fn changes(&self, locator: &ChangeLocator) -> Result<Vec<Change>> {
        let mut query = vec![(
            "locator",
            format!(
                "branch:name:{},buildType:{}",
                locator.branch, locator.build_type
            ),
        )];
        if let Some(since) = locator.since {
            query.push(("sinceChange", format!("id:{}", since)));
        }
        let changes: ChangesDto = self.get("changes/", &query).await?;
        Ok(changes.into_changes())
    }

    /// Put a branch into the build queue.
    pub async fn add_to_queue(&self, request: &EnqueueRequest) -> Result<()> {
        let body = BuildRequestDto {
            build_type: BuildTypeRef {
                id: &request.build_type,
            },
            branch_name: request.branch.as_str(),
            properties: PropertiesDto::from(&request.properties),
        };
        self.post("buildQueue", &body).await
    }
}

#[async_trait]
impl BuildServer for TeamCityClient {
    async fn list_builds(&self, locator: &BuildLocator) -> RemoteResult<Vec<Build>> {
        Ok(self.builds(locator).await?)
    }

    async fn queued_builds(&self) -> RemoteResult<Vec<Build>> {
        Ok(self.build_queue().await?)
    }

    async fn build(&self, id: BuildId) -> RemoteResult<Build> {
        Ok(self.build_detail(id).await?)
    }

    async fn list_changes(&self, locator: &ChangeLocator) -> RemoteResult<Vec<Change>> {
        Ok(self.changes(locator).await?)
    }

    async fn enqueue(&self, request: &EnqueueRequest) -> RemoteResult<()> {
        Ok(self.add_to_queue(request).await?)
    }

    fn display_url(&self) -> &str {
        self.config.display_url.trim_end_matches('/')
    }
}
