use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Serialize;

use crate::auth::{Session, Token};
use crate::client::{MetricsClient, MetricsSource};
use crate::error::OpsboardError;
use crate::export::MetricExport;
use crate::loader::{fetch_entity_counts, DashboardLoader, CURRENT_PERIOD};
use crate::models::Project;
use crate::selection::{sort_projects, ProjectSelection};
use crate::views::{self, DashboardReport};

const DEFAULT_API_URL: &str = "http://localhost:5000/api";
const DEFAULT_TIMESERIES_PERIOD: &str = "30d";
const DEFAULT_TIMESERIES_INTERVAL: &str = "day";

#[derive(Parser)]
#[command(name = "opsboard")]
#[command(author, version, about = "DevOps Metrics Dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the metrics API
    #[arg(short = 'u', long, global = true, env = "OPSBOARD_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// API token (optional, sent as a bearer token)
    #[arg(short, long, global = true, env = "OPSBOARD_API_TOKEN")]
    token: Option<String>,

    /// Organization shown in the dashboard header
    #[arg(long, global = true, env = "OPSBOARD_ORGANIZATION")]
    organization: Option<String>,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Json)]
    format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportMetric {
    Repositories,
    Pipelines,
    Releases,
}

impl ExportMetric {
    fn label(self) -> &'static str {
        match self {
            Self::Repositories => "Repositories",
            Self::Pipelines => "Build Pipelines",
            Self::Releases => "Release Pipelines",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List projects, sorted by name
    Projects,

    /// Project overview: window counts with deltas, deployments, rates and totals
    Dashboard {
        /// Project ID or name (defaults to the first project by name)
        #[arg(short = 'P', long)]
        project: Option<String>,
    },

    /// Raw metrics for one trailing window
    Metrics {
        #[arg(short = 'P', long)]
        project: Option<String>,

        /// Window length in days, e.g. "7d"
        #[arg(long, default_value = CURRENT_PERIOD)]
        period: String,
    },

    /// Commits, builds and releases per interval
    Timeseries {
        #[arg(short = 'P', long)]
        project: Option<String>,

        #[arg(long, default_value = DEFAULT_TIMESERIES_PERIOD)]
        period: String,

        /// Bucket size, e.g. "day" or "week"
        #[arg(long, default_value = DEFAULT_TIMESERIES_INTERVAL)]
        interval: String,
    },

    /// Build pipelines of a project
    Pipelines {
        #[arg(short = 'P', long)]
        project: Option<String>,
    },

    /// Release definitions of a project
    Releases {
        #[arg(short = 'P', long)]
        project: Option<String>,
    },

    /// Repositories of a project
    Repos {
        #[arg(short = 'P', long)]
        project: Option<String>,
    },

    /// Most recent commits across a project's repositories
    Commits {
        #[arg(short = 'P', long)]
        project: Option<String>,
    },

    /// Deployments per environment, for one project or the whole organization
    Deployments {
        #[arg(short = 'P', long)]
        project: Option<String>,
    },

    /// Daily, weekly and monthly activity totals
    Activity,

    /// Export a single total as a CSV file
    Export {
        #[arg(short = 'P', long)]
        project: Option<String>,

        #[arg(short, long, value_enum)]
        metric: ExportMetric,

        /// Directory the CSV file is written to
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

/// Applies an explicit `--project` choice, or falls back to the first sorted project.
fn choose_project<'a>(
    projects: &'a [Project],
    selection: &ProjectSelection,
    requested: Option<&str>,
) -> std::result::Result<&'a Project, OpsboardError> {
    if let Some(requested) = requested {
        let found = projects
            .iter()
            .find(|p| p.project_id == requested || p.project_name == requested)
            .or_else(|| {
                projects
                    .iter()
                    .find(|p| p.project_name.eq_ignore_ascii_case(requested))
            })
            .ok_or_else(|| OpsboardError::ProjectNotFound(requested.to_string()))?;
        selection.set(Some(found.project_id.clone()));
    } else {
        selection.initialize(projects);
    }

    selection
        .get()
        .and_then(|id| projects.iter().find(|p| p.project_id == id))
        .ok_or(OpsboardError::NoProjects)
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let mut session = Session::default();
        if let Some(organization) = &self.organization {
            session.login(organization);
        }
        if !session.is_authenticated() {
            bail!("Session is not authenticated");
        }

        let client = MetricsClient::new(&self.api_url, self.token.clone().map(Token::from))?;
        let selection = ProjectSelection::new();

        let outcome = self.run(client, &selection, &session).await;
        session.logout(&selection);
        outcome
    }

    async fn run(
        &self,
        client: MetricsClient,
        selection: &ProjectSelection,
        session: &Session,
    ) -> Result<()> {
        match &self.command {
            Commands::Projects => {
                let projects = Self::sorted_projects(&client).await?;
                self.emit(&projects, |p| views::render_projects(p))
            }
            Commands::Dashboard { project } => {
                let projects = Self::sorted_projects(&client).await?;
                choose_project(&projects, selection, project.as_deref())?;

                let loader = DashboardLoader::new(Arc::new(client));
                if let Some(handle) = loader.load_selected(selection, &projects) {
                    handle.settled().await;
                }

                let report = DashboardReport::new(
                    loader.snapshot(),
                    projects.len(),
                    session.organization().map(str::to_string),
                );
                self.emit(&report, views::render_dashboard)
            }
            Commands::Metrics { project, period } => {
                let name = Self::project_name(&client, selection, project).await?;
                let metrics = client.fetch_project_metrics(&name, period).await?;
                self.emit(&metrics, |m| views::render_metrics(m, period))
            }
            Commands::Timeseries {
                project,
                period,
                interval,
            } => {
                let name = Self::project_name(&client, selection, project).await?;
                let points = client
                    .fetch_metrics_timeseries(&name, period, interval)
                    .await?;
                self.emit(&points, |p| views::render_timeseries(p))
            }
            Commands::Pipelines { project } => {
                let name = Self::project_name(&client, selection, project).await?;
                let pipelines = client.fetch_pipelines(&name).await?;
                self.emit(&pipelines, |items| {
                    views::render_named(items.iter().map(|p| (p.name.as_str(), p.url.as_deref())))
                })
            }
            Commands::Releases { project } => {
                let name = Self::project_name(&client, selection, project).await?;
                let releases = client.fetch_release_definitions(&name).await?;
                self.emit(&releases, |items| {
                    views::render_named(items.iter().map(|r| (r.name.as_str(), r.url.as_deref())))
                })
            }
            Commands::Repos { project } => {
                let name = Self::project_name(&client, selection, project).await?;
                let repositories = client.fetch_repositories(&name).await?;
                self.emit(&repositories, |items| {
                    views::render_named(items.iter().map(|r| (r.name.as_str(), r.url.as_deref())))
                })
            }
            Commands::Commits { project } => {
                let name = Self::project_name(&client, selection, project).await?;
                let commits = client.fetch_recent_commits(&name).await?;
                self.emit(&commits, |c| views::render_commits(c))
            }
            Commands::Deployments { project } => {
                let all = if project.is_some() {
                    let name = Self::project_name(&client, selection, project).await?;
                    vec![client.fetch_project_deployments_by_environment(&name).await?]
                } else {
                    client.fetch_deployments_by_environment().await?
                };
                self.emit(&all, |d| views::render_deployments(d))
            }
            Commands::Activity => {
                let summary = client.fetch_activity_summary().await?;
                self.emit(&summary, views::render_activity)
            }
            Commands::Export {
                project,
                metric,
                dir,
            } => {
                let projects = Self::sorted_projects(&client).await?;
                let chosen = choose_project(&projects, selection, project.as_deref())?;

                let counts = match fetch_entity_counts(&client, &chosen.project_name).await {
                    Ok(counts) => Some(counts),
                    Err(e) => {
                        warn!("Counts unavailable for {}: {e}", chosen.project_name);
                        None
                    }
                };
                let value = counts.map(|c| match metric {
                    ExportMetric::Repositories => c.repositories,
                    ExportMetric::Pipelines => c.pipelines,
                    ExportMetric::Releases => c.releases,
                });
                let export = match value {
                    Some(value) => MetricExport::new(metric.label(), value),
                    None => MetricExport::new(metric.label(), "-"),
                };
                let path = export.write_to(dir)?;
                println!("{}", path.display());
                Ok(())
            }
        }
    }

    async fn sorted_projects(client: &MetricsClient) -> Result<Vec<Project>> {
        let mut projects = client.fetch_projects().await?;
        sort_projects(&mut projects);
        info!("Loaded {} projects", projects.len());
        Ok(projects)
    }

    async fn project_name(
        client: &MetricsClient,
        selection: &ProjectSelection,
        requested: &Option<String>,
    ) -> Result<String> {
        let projects = Self::sorted_projects(client).await?;
        let project = choose_project(&projects, selection, requested.as_deref())?;
        info!("Using project: {}", project.project_name);
        Ok(project.project_name.clone())
    }

    fn emit<T: Serialize>(&self, value: &T, render: impl FnOnce(&T) -> String) -> Result<()> {
        let rendered = match self.format {
            Format::Json if self.pretty => serde_json::to_string_pretty(value)?,
            Format::Json => serde_json::to_string(value)?,
            Format::Text => render(value),
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, rendered)?;
            info!("Output written to: {}", output_path.display());
        } else {
            println!("{rendered}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, name: &str) -> Project {
        Project {
            project_id: id.to_string(),
            project_name: name.to_string(),
            repositories: vec![],
            build_pipelines: vec![],
            release_pipelines: vec![],
        }
    }

    fn projects() -> Vec<Project> {
        let mut projects = vec![project("2", "Zebra"), project("1", "Atlas")];
        sort_projects(&mut projects);
        projects
    }

    #[test]
    fn test_choose_defaults_to_first_sorted_project() {
        let selection = ProjectSelection::new();

        let chosen = choose_project(&projects(), &selection, None).unwrap().clone();

        assert_eq!(chosen.project_name, "Atlas");
        assert_eq!(selection.get().as_deref(), Some("1"));
    }

    #[test]
    fn test_choose_by_id_or_name() {
        let projects = projects();
        let selection = ProjectSelection::new();

        assert_eq!(
            choose_project(&projects, &selection, Some("2")).unwrap().project_name,
            "Zebra"
        );
        assert_eq!(
            choose_project(&projects, &selection, Some("atlas")).unwrap().project_id,
            "1"
        );
        assert_eq!(selection.get().as_deref(), Some("1"));
    }

    #[test]
    fn test_choose_unknown_project_fails() {
        let projects = projects();
        let result = choose_project(&projects, &ProjectSelection::new(), Some("Nope"));

        assert!(matches!(result, Err(OpsboardError::ProjectNotFound(ref p)) if p == "Nope"));
    }

    #[test]
    fn test_choose_from_empty_list_fails() {
        let result = choose_project(&[], &ProjectSelection::new(), None);

        assert!(matches!(result, Err(OpsboardError::NoProjects)));
    }

    #[test]
    fn test_cli_parses_dashboard_flags() {
        let cli = Cli::try_parse_from([
            "opsboard",
            "dashboard",
            "--project",
            "Atlas",
            "--format",
            "text",
            "--api-url",
            "http://metrics.internal/api",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::Dashboard { project: Some(ref p) } if p == "Atlas"
        ));
        assert!(cli.format == Format::Text);
        assert_eq!(cli.api_url, "http://metrics.internal/api");
    }

    #[test]
    fn test_export_labels() {
        assert_eq!(ExportMetric::Repositories.label(), "Repositories");
        assert_eq!(ExportMetric::Pipelines.label(), "Build Pipelines");
    }
}
