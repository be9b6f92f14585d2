//! Text rendering for every subcommand. Nothing here computes metrics; values
//! that are missing or still loading are shown as placeholders.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::delta::{format_delta, one_decimal, MetricDeltas};
use crate::loader::DashboardState;
use crate::models::{
    ActivityMetrics, ActivitySummary, Commit, DeploymentsByEnvironment, Project, ProjectMetrics,
    TimeseriesPoint, ENVIRONMENTS,
};

const PLACEHOLDER: &str = "-";
const LOADING: &str = "...";
const LABEL_WIDTH: usize = 26;

/// Everything the dashboard view shows, in a serialisable form.
#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub organization: Option<String>,
    pub total_projects: usize,
    pub deltas: Option<MetricDeltas>,
    #[serde(flatten)]
    pub state: DashboardState,
}

impl DashboardReport {
    pub fn new(state: DashboardState, total_projects: usize, organization: Option<String>) -> Self {
        Self {
            generated_at: Utc::now(),
            organization,
            total_projects,
            deltas: state.deltas(),
            state,
        }
    }
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
}

fn percentage(rate: Option<f64>) -> String {
    rate.map_or_else(|| PLACEHOLDER.to_string(), |r| format!("{}%", one_decimal(r)))
}

fn row(label: &str, value: impl Display) -> String {
    format!("{label:<LABEL_WIDTH$}{value}")
}

/// A window count with its delta line, hidden while the owning group loads.
fn window_row(label: &str, loading: bool, value: Option<u64>, delta: Option<f64>) -> String {
    if loading {
        return row(label, LOADING);
    }
    match delta {
        Some(delta) => row(
            label,
            format!("{:<8}{} vs previous period", or_dash(value), format_delta(delta)),
        ),
        None => row(label, or_dash(value)),
    }
}

fn deployments_block(state: &DashboardState) -> Vec<String> {
    let mut lines = vec!["Deployments by environment".to_string()];

    if state.deployments.loading {
        lines.push(format!("  {LOADING}"));
    } else if let Some(message) = &state.deployments_error {
        lines.push(format!("  {message}"));
    } else if let Some(deployments) = &state.deployments.value {
        lines.extend(environment_rows(deployments).into_iter().map(|l| format!("  {l}")));
    } else {
        lines.push("  No data".to_string());
    }

    let frequency = if state.deployments.loading {
        LOADING.to_string()
    } else {
        let value = state
            .deployments
            .value
            .as_ref()
            .and_then(|d| d.deployment_frequency);
        format!("{} /day", or_dash(value))
    };
    lines.push(row("Deployment frequency", frequency));
    lines
}

/// The well-known environments first, then anything else the server reported.
fn environment_rows(deployments: &DeploymentsByEnvironment) -> Vec<String> {
    let mut names: Vec<&str> = ENVIRONMENTS.to_vec();
    names.extend(
        deployments
            .environments
            .keys()
            .map(String::as_str)
            .filter(|name| !ENVIRONMENTS.contains(name)),
    );

    names
        .into_iter()
        .map(|name| row(name, deployments.count(name)))
        .collect()
}

pub fn render_dashboard(report: &DashboardReport) -> String {
    let state = &report.state;
    let metrics = state.current.value.as_ref();
    let deltas = report.deltas;

    let mut lines = Vec::new();
    lines.push(match &state.project_name {
        Some(name) => format!("Details for: {name}"),
        None => "Select a Project".to_string(),
    });
    if let Some(organization) = &report.organization {
        lines.push(row("Organization", organization));
    }
    lines.push(String::new());
    lines.push(row("Total projects", report.total_projects));

    let window = state.current_window();
    lines.push(window_row(
        "Build pipelines (7d)",
        state.counts.loading,
        window.map(|w| w.pipeline_count),
        deltas.map(|d| d.pipeline),
    ));
    lines.push(window_row(
        "Release pipelines (7d)",
        state.counts.loading,
        window.map(|w| w.release_count),
        deltas.map(|d| d.release),
    ));
    lines.push(window_row(
        "Commits (7d)",
        state.current.loading,
        window.map(|w| w.commit_count),
        deltas.map(|d| d.commit),
    ));

    lines.push(String::new());
    lines.extend(deployments_block(state));

    lines.push(String::new());
    lines.push("Top committers".to_string());
    match metrics.map(|m| m.top_committers.as_slice()) {
        _ if state.current.loading => lines.push(format!("  {LOADING}")),
        Some(committers) if !committers.is_empty() => {
            lines.extend(
                committers
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("  {}. {:<20} {}", i + 1, c.name, c.commit_count)),
            );
        }
        _ => lines.push("  No data".to_string()),
    }

    lines.push(String::new());
    if state.current.loading {
        lines.push(row("Release success rate", LOADING));
        lines.push(row("Total builds (7d)", LOADING));
        lines.push(row("Build success rate", LOADING));
    } else {
        lines.push(row(
            "Release success rate",
            percentage(metrics.and_then(|m| m.release_success_rate)),
        ));
        lines.push(row(
            "Total builds (7d)",
            or_dash(metrics.and_then(|m| m.total_build_count_7d)),
        ));
        lines.push(row(
            "Build success rate",
            percentage(metrics.and_then(|m| m.build_success_rate)),
        ));
    }

    lines.push(String::new());
    let counts = state.counts.value;
    lines.push(row("Repositories", or_dash(counts.map(|c| c.repositories))));
    lines.push(row("Build pipelines", or_dash(counts.map(|c| c.pipelines))));
    lines.push(row("Release pipelines", or_dash(counts.map(|c| c.releases))));

    lines.join("\n")
}

pub fn render_projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects found".to_string();
    }

    projects
        .iter()
        .map(|p| {
            [
                format!("{} ({})", p.project_name, p.project_id),
                format!("  repositories:      {}", p.repositories.join(", ")),
                format!("  build pipelines:   {}", p.build_pipelines.join(", ")),
                format!("  release pipelines: {}", p.release_pipelines.join(", ")),
            ]
            .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Name and url columns for pipelines, release definitions and repositories.
pub fn render_named<'a>(rows: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> String {
    let lines: Vec<_> = rows
        .into_iter()
        .map(|(name, url)| format!("{name:<40}{}", url.unwrap_or(PLACEHOLDER)))
        .collect();

    if lines.is_empty() {
        "No data".to_string()
    } else {
        lines.join("\n")
    }
}

pub fn render_metrics(metrics: &ProjectMetrics, period: &str) -> String {
    let mut lines = vec![format!("{} ({period})", metrics.project_name)];
    lines.push(row("Pipelines", metrics.pipeline_count));
    lines.push(row("Releases", metrics.release_count));
    lines.push(row("Repositories", metrics.repository_count));
    lines.push(row("Commits", or_dash(metrics.commit_count)));
    lines.push(row("Pipeline runs / day", or_dash(metrics.pipeline_run_avg_7d)));
    lines.push(row("Releases / day", or_dash(metrics.release_avg_7d)));
    lines.push(row("Total builds", or_dash(metrics.total_build_count_7d)));
    lines.push(row("Release success rate", percentage(metrics.release_success_rate)));
    lines.push(row("Build success rate", percentage(metrics.build_success_rate)));
    lines.join("\n")
}

pub fn render_timeseries(points: &[TimeseriesPoint]) -> String {
    let mut lines = vec![format!("{:<12}{:>9}{:>9}{:>9}", "date", "commits", "builds", "releases")];
    lines.extend(points.iter().map(|p| {
        format!("{:<12}{:>9}{:>9}{:>9}", p.date, p.commits, p.builds, p.releases)
    }));
    lines.join("\n")
}

pub fn render_commits(commits: &[Commit]) -> String {
    if commits.is_empty() {
        return "No data".to_string();
    }

    commits
        .iter()
        .map(|c| {
            let short_id: String = c.commit_id.chars().take(8).collect();
            let subject = c.comment.lines().next().unwrap_or_default();
            format!(
                "{short_id}  {}  {:<20} {subject}",
                c.author.date.format("%Y-%m-%d %H:%M"),
                c.author.name
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_deployments(all: &[DeploymentsByEnvironment]) -> String {
    if all.is_empty() {
        return "No data".to_string();
    }

    let header = std::iter::once(format!(
        "{:<LABEL_WIDTH$}{}",
        "project",
        ENVIRONMENTS.map(|e| format!("{e:>12}")).concat()
    ));
    let rows = all.iter().map(|d| {
        format!(
            "{:<LABEL_WIDTH$}{}",
            d.project.as_deref().unwrap_or(PLACEHOLDER),
            ENVIRONMENTS.map(|e| format!("{:>12}", d.count(e))).concat()
        )
    });
    header.chain(rows).collect::<Vec<_>>().join("\n")
}

pub fn render_activity(summary: &ActivitySummary) -> String {
    let line = |label: &str, m: &ActivityMetrics| {
        format!(
            "{label:<10}{:>15}{:>10}{:>10}",
            m.pipeline_runs, m.releases, m.commits
        )
    };

    [
        format!("{:<10}{:>15}{:>10}{:>10}", "", "pipeline runs", "releases", "commits"),
        line("daily", &summary.daily),
        line("weekly", &summary.weekly),
        line("monthly", &summary.monthly),
    ]
    .join("\n")
}
