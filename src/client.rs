use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Token;
use crate::error::{OpsboardError, Result};
use crate::models::{
    ActivitySummary, Commit, DeploymentsByEnvironment, Pipeline, Project, ProjectMetrics, Release,
    Repository, TimeseriesPoint,
};

/// The fetches the dashboard loader depends on.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch_project_metrics(&self, project_name: &str, period: &str)
        -> Result<ProjectMetrics>;

    async fn fetch_repositories(&self, project_name: &str) -> Result<Vec<Repository>>;

    async fn fetch_pipelines(&self, project_name: &str) -> Result<Vec<Pipeline>>;

    async fn fetch_release_definitions(&self, project_name: &str) -> Result<Vec<Release>>;

    async fn fetch_project_deployments_by_environment(
        &self,
        project_name: &str,
    ) -> Result<DeploymentsByEnvironment>;
}

/// Read-only client for the dashboard metrics API.
pub struct MetricsClient {
    client: Client,
    api_url: Url,
    token: Option<Token>,
}

impl MetricsClient {
    pub fn new(base_url: &str, token: Option<Token>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("opsboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OpsboardError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut api_url = Url::parse(base_url)
            .map_err(|e| OpsboardError::Config(format!("Invalid base URL: {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(OpsboardError::Config(format!(
                "Base URL cannot carry a path: {base_url}"
            )));
        }
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// Appends already-decoded path segments under the API root, percent-encoding each.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| OpsboardError::Config("Invalid API base URL".to_string()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    fn project_endpoint(&self, project_name: &str, tail: &[&str]) -> Result<Url> {
        let mut segments = vec!["projects", project_name];
        segments.extend_from_slice(tail);
        self.endpoint(&segments)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, query: &[(&str, &str)]) -> Result<T> {
        debug!("GET {url} {query:?}");

        let mut request = self.client.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = self.auth_request(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OpsboardError::Status { status, body });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn fetch_projects(&self) -> Result<Vec<Project>> {
        self.get_json(self.endpoint(&["devops-info"])?, &[]).await
    }

    pub async fn fetch_metrics_timeseries(
        &self,
        project_name: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<TimeseriesPoint>> {
        let url = self.project_endpoint(project_name, &["metrics", "timeseries"])?;
        self.get_json(url, &[("period", period), ("interval", interval)])
            .await
    }

    pub async fn fetch_recent_commits(&self, project_name: &str) -> Result<Vec<Commit>> {
        let url = self.project_endpoint(project_name, &["recent-commits"])?;
        self.get_json(url, &[]).await
    }

    /// Deployment counts for every project in the organisation.
    pub async fn fetch_deployments_by_environment(&self) -> Result<Vec<DeploymentsByEnvironment>> {
        self.get_json(self.endpoint(&["deployments-by-environment"])?, &[])
            .await
    }

    pub async fn fetch_activity_summary(&self) -> Result<ActivitySummary> {
        self.get_json(self.endpoint(&["activity_summary"])?, &[])
            .await
    }
}

#[async_trait]
impl MetricsSource for MetricsClient {
    async fn fetch_project_metrics(
        &self,
        project_name: &str,
        period: &str,
    ) -> Result<ProjectMetrics> {
        let url = self.project_endpoint(project_name, &["metrics"])?;
        self.get_json(url, &[("period", period)]).await
    }

    async fn fetch_repositories(&self, project_name: &str) -> Result<Vec<Repository>> {
        let url = self.project_endpoint(project_name, &["repos"])?;
        self.get_json(url, &[]).await
    }

    async fn fetch_pipelines(&self, project_name: &str) -> Result<Vec<Pipeline>> {
        let url = self.project_endpoint(project_name, &["pipelines"])?;
        self.get_json(url, &[]).await
    }

    async fn fetch_release_definitions(&self, project_name: &str) -> Result<Vec<Release>> {
        let url = self.project_endpoint(project_name, &["releases"])?;
        self.get_json(url, &[]).await
    }

    async fn fetch_project_deployments_by_environment(
        &self,
        project_name: &str,
    ) -> Result<DeploymentsByEnvironment> {
        let url = self.project_endpoint(project_name, &["deployments-by-environment"])?;
        self.get_json(url, &[]).await
    }
}
