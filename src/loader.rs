//! Dashboard orchestration: one load per selected project, fanned out into
//! independent fetch groups whose results land in a shared [`DashboardState`].
//!
//! Every load is stamped with a generation number. A group that settles after a
//! newer load (or a reset) has started finds a different generation in the state
//! and drops its result, so a slow response for an old selection can never
//! overwrite data belonging to the current one.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::client::MetricsSource;
use crate::delta::{MetricDeltas, WindowCounts};
use crate::error::Result;
use crate::models::{DeploymentsByEnvironment, Project, ProjectMetrics};
use crate::selection::ProjectSelection;

pub const CURRENT_PERIOD: &str = "7d";
pub const COMPARISON_PERIOD: &str = "14d";

const GROUP_COUNT: usize = 4;
const DEPLOYMENTS_UNAVAILABLE: &str = "Data unavailable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
}

/// Result of one fetch group plus its own loading and failure flags.
#[derive(Debug, Clone, Serialize)]
pub struct FetchSlot<T> {
    pub loading: bool,
    pub failed: bool,
    pub value: Option<T>,
}

impl<T> Default for FetchSlot<T> {
    fn default() -> Self {
        Self {
            loading: false,
            failed: false,
            value: None,
        }
    }
}

impl<T> FetchSlot<T> {
    fn start(&mut self) {
        self.loading = true;
        self.failed = false;
        self.value = None;
    }

    fn settle(&mut self, result: Result<T>) {
        self.loading = false;
        match result {
            Ok(value) => {
                self.failed = false;
                self.value = Some(value);
            }
            Err(_) => {
                self.failed = true;
                self.value = None;
            }
        }
    }
}

/// Sizes of the repository, build pipeline and release definition lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub repositories: usize,
    pub pipelines: usize,
    pub releases: usize,
}

/// Fetches the three entity lists together and keeps only their sizes.
///
/// Any single failure fails the whole group.
pub async fn fetch_entity_counts<S>(source: &S, project_name: &str) -> Result<EntityCounts>
where
    S: MetricsSource + ?Sized,
{
    let (repositories, pipelines, releases) = tokio::try_join!(
        source.fetch_repositories(project_name),
        source.fetch_pipelines(project_name),
        source.fetch_release_definitions(project_name),
    )?;

    Ok(EntityCounts {
        repositories: repositories.len(),
        pipelines: pipelines.len(),
        releases: releases.len(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub status: LoadStatus,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub current: FetchSlot<ProjectMetrics>,
    pub comparison: FetchSlot<ProjectMetrics>,
    pub counts: FetchSlot<EntityCounts>,
    pub deployments: FetchSlot<DeploymentsByEnvironment>,
    pub deployments_error: Option<String>,
    #[serde(skip)]
    generation: u64,
    #[serde(skip)]
    pending: usize,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            status: LoadStatus::Idle,
            project_id: None,
            project_name: None,
            current: FetchSlot::default(),
            comparison: FetchSlot::default(),
            counts: FetchSlot::default(),
            deployments: FetchSlot::default(),
            deployments_error: None,
            generation: 0,
            pending: 0,
        }
    }
}

impl DashboardState {
    fn begin(&mut self, project: &Project) -> u64 {
        self.generation += 1;
        self.status = LoadStatus::Loading;
        self.project_id = Some(project.project_id.clone());
        self.project_name = Some(project.project_name.clone());
        self.current.start();
        self.comparison.start();
        self.counts.start();
        self.deployments.start();
        self.deployments_error = None;
        self.pending = GROUP_COUNT;
        self.generation
    }

    fn group_settled(&mut self) {
        self.pending = self.pending.saturating_sub(1);
        if self.pending == 0 {
            self.status = LoadStatus::Ready;
        }
    }

    pub fn current_window(&self) -> Option<WindowCounts> {
        self.current.value.as_ref().map(WindowCounts::from)
    }

    /// The comparison window only counts once the current window is also known.
    pub fn comparison_window(&self) -> Option<WindowCounts> {
        self.current_window()?;
        self.comparison.value.as_ref().map(WindowCounts::from)
    }

    pub fn deltas(&self) -> Option<MetricDeltas> {
        Some(MetricDeltas::between(
            self.current_window()?,
            self.comparison_window()?,
        ))
    }
}

/// Awaitable handle over the fetch groups of one load.
pub struct LoadHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl LoadHandle {
    /// Resolves once every group of this load has settled or been discarded.
    pub async fn settled(self) {
        for joined in join_all(self.tasks).await {
            if let Err(e) = joined {
                warn!("Fetch group task ended abnormally: {e}");
            }
        }
    }
}

fn lock(state: &Mutex<DashboardState>) -> MutexGuard<'_, DashboardState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DashboardLoader<S> {
    source: Arc<S>,
    state: Arc<Mutex<DashboardState>>,
}

impl<S: MetricsSource + 'static> DashboardLoader<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(DashboardState::default())),
        }
    }

    pub fn snapshot(&self) -> DashboardState {
        lock(&self.state).clone()
    }

    /// Back to idle. Groups still in flight are discarded when they settle.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        let generation = state.generation + 1;
        *state = DashboardState {
            generation,
            ..DashboardState::default()
        };
    }

    /// Loads the project currently held by `selection`, or resets when there is none.
    pub fn load_selected(
        &self,
        selection: &ProjectSelection,
        projects: &[Project],
    ) -> Option<LoadHandle> {
        let selected = selection
            .get()
            .and_then(|id| projects.iter().find(|p| p.project_id == id));

        match selected {
            Some(project) => Some(self.load(project)),
            None => {
                debug!("No resolvable project selected, dashboard is idle");
                self.reset();
                None
            }
        }
    }

    /// Starts a fresh load for `project`, superseding any load in flight.
    pub fn load(&self, project: &Project) -> LoadHandle {
        let generation = lock(&self.state).begin(project);
        let name = project.project_name.clone();

        info!("Loading dashboard for project: {name} (generation {generation})");

        let current = {
            let source = Arc::clone(&self.source);
            let name = name.clone();
            self.spawn_group(
                generation,
                "current metrics",
                async move { source.fetch_project_metrics(&name, CURRENT_PERIOD).await },
                |state, result| state.current.settle(result),
            )
        };

        let comparison = {
            let source = Arc::clone(&self.source);
            let name = name.clone();
            self.spawn_group(
                generation,
                "comparison metrics",
                async move {
                    source
                        .fetch_project_metrics(&name, COMPARISON_PERIOD)
                        .await
                },
                |state, result| state.comparison.settle(result),
            )
        };

        // All three lists or none: one failure blanks every count.
        let counts = {
            let source = Arc::clone(&self.source);
            let name = name.clone();
            self.spawn_group(
                generation,
                "entity counts",
                async move { fetch_entity_counts(source.as_ref(), &name).await },
                |state, result| state.counts.settle(result),
            )
        };

        let deployments = {
            let source = Arc::clone(&self.source);
            self.spawn_group(
                generation,
                "deployments",
                async move {
                    source
                        .fetch_project_deployments_by_environment(&name)
                        .await
                },
                |state, result| {
                    state.deployments_error = result
                        .is_err()
                        .then(|| DEPLOYMENTS_UNAVAILABLE.to_string());
                    state.deployments.settle(result);
                },
            )
        };

        LoadHandle {
            tasks: vec![current, comparison, counts, deployments],
        }
    }

    fn spawn_group<T, F, A>(
        &self,
        generation: u64,
        group: &'static str,
        fetch: F,
        apply: A,
    ) -> JoinHandle<()>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
        A: FnOnce(&mut DashboardState, Result<T>) + Send + 'static,
    {
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let result = fetch.await;

            let mut state = lock(&state);
            if state.generation != generation {
                debug!("Discarding stale {group} response from generation {generation}");
                return;
            }
            if let Err(e) = &result {
                warn!("Fetch group '{group}' failed: {e}");
            }
            apply(&mut state, result);
            state.group_settled();
        })
    }
}
