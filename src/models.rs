use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A project as listed by `/devops-info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: String,
    pub project_name: String,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub build_pipelines: Vec<String>,
    #[serde(default)]
    pub release_pipelines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSignature {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub commit_id: String,
    pub author: CommitSignature,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub repository_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCommitter {
    pub name: String,
    pub commit_count: u64,
}

/// Metrics for one project over one trailing window.
///
/// Two values for the same project at different periods are independent
/// snapshots. Decoding goes through [`RawProjectMetrics`] so that renamed
/// server fields resolve in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProjectMetrics")]
pub struct ProjectMetrics {
    pub project_name: String,
    pub pipeline_count: u64,
    pub release_count: u64,
    pub repository_count: u64,
    pub commit_count: Option<u64>,
    pub top_committers: Vec<TopCommitter>,
    pub release_success_rate: Option<f64>,
    pub build_success_rate: Option<f64>,
    pub total_build_count_7d: Option<u64>,
    pub pipeline_run_avg_7d: Option<f64>,
    pub release_avg_7d: Option<f64>,
}

/// Wire shape of a metrics response, with every known alias present.
#[derive(Debug, Default, Deserialize)]
pub struct RawProjectMetrics {
    #[serde(default)]
    project_name: String,
    pipeline_count: Option<u64>,
    pipeline_runs: Option<u64>,
    release_count: Option<u64>,
    releases: Option<u64>,
    repository_count: Option<u64>,
    commit_count: Option<u64>,
    commits: Option<u64>,
    #[serde(default)]
    top_committers: Option<Vec<TopCommitter>>,
    release_success_rate: Option<f64>,
    build_success_rate: Option<f64>,
    total_build_count_7d: Option<u64>,
    pipeline_run_avg_7d: Option<f64>,
    release_avg_7d: Option<f64>,
}

/// Primary name first, then the alias.
fn prefer<T>(primary: Option<T>, alias: Option<T>) -> Option<T> {
    primary.or(alias)
}

impl From<RawProjectMetrics> for ProjectMetrics {
    fn from(raw: RawProjectMetrics) -> Self {
        Self {
            project_name: raw.project_name,
            pipeline_count: prefer(raw.pipeline_count, raw.pipeline_runs).unwrap_or(0),
            release_count: prefer(raw.release_count, raw.releases).unwrap_or(0),
            repository_count: raw.repository_count.unwrap_or(0),
            commit_count: prefer(raw.commit_count, raw.commits),
            top_committers: raw.top_committers.unwrap_or_default(),
            release_success_rate: raw.release_success_rate,
            build_success_rate: raw.build_success_rate,
            total_build_count_7d: raw.total_build_count_7d,
            pipeline_run_avg_7d: raw.pipeline_run_avg_7d,
            release_avg_7d: raw.release_avg_7d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: String,
    #[serde(default)]
    pub commits: u64,
    #[serde(default)]
    pub builds: u64,
    #[serde(default)]
    pub releases: u64,
}

pub const ENVIRONMENTS: [&str; 3] = ["Test", "Staging", "Production"];

/// Deployment counts keyed by environment name, in server order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDeployments")]
pub struct DeploymentsByEnvironment {
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_frequency: Option<f64>,
    #[serde(flatten)]
    pub environments: IndexMap<String, u64>,
}

#[derive(Debug, Deserialize)]
pub struct RawDeployments {
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    deployment_frequency: Option<f64>,
    #[serde(flatten)]
    rest: IndexMap<String, serde_json::Value>,
}

impl From<RawDeployments> for DeploymentsByEnvironment {
    fn from(raw: RawDeployments) -> Self {
        // Non-numeric extra keys are not environments.
        let environments = raw
            .rest
            .into_iter()
            .filter_map(|(name, value)| value.as_u64().map(|count| (name, count)))
            .collect();

        Self {
            project: raw.project,
            deployment_frequency: raw.deployment_frequency,
            environments,
        }
    }
}

impl DeploymentsByEnvironment {
    pub fn count(&self, environment: &str) -> u64 {
        self.environments.get(environment).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    #[serde(default)]
    pub pipeline_runs: u64,
    #[serde(default)]
    pub releases: u64,
    #[serde(default)]
    pub commits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub daily: ActivityMetrics,
    pub weekly: ActivityMetrics,
    pub monthly: ActivityMetrics,
}
