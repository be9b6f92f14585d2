use std::fmt::Display;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::Result;

/// A single metric rendered as a two-line CSV document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricExport {
    pub filename: String,
    pub content: String,
}

impl MetricExport {
    /// Names are written verbatim; a comma in `name` is not escaped.
    pub fn new(name: &str, value: impl Display) -> Self {
        let stem: String = name
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect::<String>()
            .to_lowercase();

        Self {
            filename: format!("{stem}_export.csv"),
            content: format!("Metric,Value\n{name},{value}"),
        }
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.content)?;
        info!("Metric exported to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_repositories() {
        let export = MetricExport::new("Repositories", 42);

        assert_eq!(export.content, "Metric,Value\nRepositories,42");
        assert_eq!(export.filename, "repositories_export.csv");
    }

    #[test]
    fn test_export_name_with_spaces() {
        let export = MetricExport::new("Build Pipelines", 7);

        assert_eq!(export.filename, "build_pipelines_export.csv");
        assert_eq!(export.content, "Metric,Value\nBuild Pipelines,7");
    }

    #[test]
    fn test_export_unavailable_value() {
        let export = MetricExport::new("Release Pipelines", "-");

        assert_eq!(export.content, "Metric,Value\nRelease Pipelines,-");
    }

    #[test]
    fn test_export_does_not_escape_commas() {
        let export = MetricExport::new("Repos, total", 3);

        assert_eq!(export.content, "Metric,Value\nRepos, total,3");
        assert_eq!(export.filename, "repos,_total_export.csv");
    }

    #[test]
    fn test_write_to_directory() {
        let dir = std::env::temp_dir().join(format!("opsboard-export-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = MetricExport::new("Repositories", 42).write_to(&dir).unwrap();

        assert_eq!(path.file_name().unwrap(), "repositories_export.csv");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Metric,Value\nRepositories,42"
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
