use std::sync::Arc;

use feruca::Collator;
use log::debug;
use tokio::sync::watch;

use crate::models::Project;

/// The currently selected project id, shared by every view that fetches data.
///
/// Cloning yields another handle onto the same cell. Writers are last-write-wins.
#[derive(Debug, Clone)]
pub struct ProjectSelection {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl Default for ProjectSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectSelection {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    /// Replaces the selection; writing the current value again is not a change.
    pub fn set(&self, project_id: Option<String>) {
        self.tx.send_if_modified(|current| {
            if *current == project_id {
                return false;
            }
            debug!("Selected project: {project_id:?}");
            *current = project_id;
            true
        });
    }

    /// Selects the first project of an already sorted list when nothing is selected yet.
    pub fn initialize(&self, sorted_projects: &[Project]) {
        self.tx.send_if_modified(|current| match (current.as_ref(), sorted_projects.first()) {
            (None, Some(first)) => {
                debug!("Defaulting selection to project: {}", first.project_name);
                *current = Some(first.project_id.clone());
                true
            }
            _ => false,
        });
    }
}

/// Sorts projects A-Z by name the way a human reads a list, not by byte value.
///
/// Uses Unicode collation with the root locale: accents and case only break
/// ties between otherwise equal names, lowercase first. Equal names keep their
/// input order.
pub fn sort_projects(projects: &mut [Project]) {
    let mut collator = Collator::default();
    projects.sort_by(|a, b| {
        collator.collate(a.project_name.as_str(), b.project_name.as_str())
    });
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

    fn names(projects: &[Project]) -> Vec<&str> {
        projects.iter().map(|p| p.project_name.as_str()).collect()
    }

    #[test]
    fn test_sort_is_case_insensitive() {
        let mut projects = vec![
            project("1", "Zeta"),
            project("2", "alpha"),
            project("3", "Beta"),
        ];

        sort_projects(&mut projects);

        assert_eq!(names(&projects), ["alpha", "Beta", "Zeta"]);
    }

    #[test]
    fn test_sort_places_accented_names_by_base_letter() {
        let mut projects = vec![
            project("1", "Zeta"),
            project("2", "Éclair"),
            project("3", "alpha"),
            project("4", "Ösel"),
            project("5", "echo"),
        ];

        sort_projects(&mut projects);

        assert_eq!(names(&projects), ["alpha", "echo", "Éclair", "Ösel", "Zeta"]);
    }

    #[test]
    fn test_initialize_picks_accented_name_before_later_letters() {
        let selection = ProjectSelection::new();
        let mut projects = vec![project("1", "Zeta"), project("2", "Ångström")];
        sort_projects(&mut projects);

        selection.initialize(&projects);

        assert_eq!(selection.get().as_deref(), Some("2"));
    }

    #[test]
    fn test_sort_is_stable_for_identical_names() {
        let mut projects = vec![
            project("1", "Atlas"),
            project("2", "atlas"),
            project("3", "Atlas"),
        ];

        sort_projects(&mut projects);

        // Lowercase first on a case-only tie, then original order.
        let ids: Vec<_> = projects.iter().map(|p| p.project_id.as_str()).collect();
        assert_eq!(ids, ["2", "1", "3"]);
    }

    #[test]
    fn test_selection_starts_empty() {
        assert_eq!(ProjectSelection::new().get(), None);
    }

    #[test]
    fn test_initialize_picks_first_sorted_project() {
        let selection = ProjectSelection::new();
        let mut projects = vec![project("2", "Zebra"), project("1", "Atlas")];
        sort_projects(&mut projects);

        selection.initialize(&projects);

        assert_eq!(selection.get().as_deref(), Some("1"));
    }

    #[test]
    fn test_initialize_keeps_existing_selection() {
        let selection = ProjectSelection::new();
        selection.set(Some("2".to_string()));

        selection.initialize(&[project("1", "Atlas"), project("2", "Zebra")]);

        assert_eq!(selection.get().as_deref(), Some("2"));
    }

    #[test]
    fn test_initialize_with_empty_list_leaves_selection_null() {
        let selection = ProjectSelection::new();

        selection.initialize(&[]);

        assert_eq!(selection.get(), None);
    }

    #[test]
    fn test_clones_share_the_same_cell() {
        let selection = ProjectSelection::new();
        let other = selection.clone();

        other.set(Some("7".to_string()));

        assert_eq!(selection.get().as_deref(), Some("7"));
    }
}
