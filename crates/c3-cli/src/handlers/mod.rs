//! Command handlers
//!
//! Each handler does the work of one subcommand and returns what the binary
//! prints, so the logic is testable without a terminal.

pub mod clear;
pub mod merge;
pub mod report;
pub mod summary;

pub use clear::execute_clear;
pub use merge::{execute_merge, MergeOutcome};
pub use report::execute_report;
pub use summary::{execute_summary, FileRow, SummaryView};

use crate::commands::ProjectArgs;
use crate::error::{CliError, CliResult};
use c3::{ProjectConfig, SNAPSHOT_FILE};
use std::path::PathBuf;

/// Load the project config named by `args`
pub fn load_project(args: &ProjectArgs) -> CliResult<ProjectConfig> {
    let file = ProjectConfig::locate(&args.config_dir, args.config.as_deref())?;
    Ok(ProjectConfig::load(&file)?)
}

/// `snapshot` if given (it must exist), else the project's persisted snapshot
pub(crate) fn snapshot_source(
    snapshot: Option<&PathBuf>,
    project: &ProjectArgs,
) -> CliResult<PathBuf> {
    match snapshot {
        Some(path) if path.is_file() => Ok(path.clone()),
        Some(path) => Err(CliError::invalid_argument(format!(
            "snapshot '{}' does not exist",
            path.display()
        ))),
        None => Ok(load_project(project)?.work_dir().join(SNAPSHOT_FILE)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use c3::{LineHits, SessionFactory};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Temp project with `codeception.yml` writing into `out/`
    pub(crate) fn project() -> (TempDir, ProjectArgs) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("codeception.yml"), "paths:\n  output: out\n").unwrap();
        let args = ProjectArgs {
            config_dir: dir.path().to_path_buf(),
            config: None,
        };
        (dir, args)
    }

    /// Merge one run into the snapshot at `path`
    pub(crate) fn seed(path: &Path, label: &str, file: &str, lines: &[(u32, u64)]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let hits: LineHits = [(file.to_string(), lines.iter().copied().collect())]
            .into_iter()
            .collect();
        let factory = SessionFactory::default();
        let (mut snapshot, mut lock) = factory.lock(path).unwrap();
        let mut run = factory.fresh();
        run.record(label, &hits);
        snapshot.merge(&run);
        lock.write_back(&snapshot).unwrap();
    }

    #[test]
    fn test_load_project_reads_output_dir() {
        let (dir, args) = project();
        let config = load_project(&args).unwrap();
        assert_eq!(config.work_dir(), dir.path().join("out/c3tmp"));
    }

    #[test]
    fn test_load_project_missing_config() {
        let dir = TempDir::new().unwrap();
        let args = ProjectArgs {
            config_dir: dir.path().to_path_buf(),
            config: None,
        };
        let err = load_project(&args).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_snapshot_source_rejects_missing_explicit_path() {
        let (dir, args) = project();
        let missing = dir.path().join("nope.serialized");
        let err = snapshot_source(Some(&missing), &args).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }

    #[test]
    fn test_snapshot_source_defaults_to_work_dir() {
        let (dir, args) = project();
        let path = snapshot_source(None, &args).unwrap();
        assert_eq!(path, dir.path().join("out/c3tmp").join(SNAPSHOT_FILE));
    }
}
