//! Clear command handler

use super::load_project;
use crate::commands::ProjectArgs;
use crate::error::CliResult;
use std::path::PathBuf;

/// Empty the project's working directory and return it.
///
/// A missing working directory is left missing.
pub fn execute_clear(args: &ProjectArgs) -> CliResult<PathBuf> {
    let work_dir = load_project(args)?.work_dir();
    if work_dir.is_dir() {
        c3::service::clear_dir(&work_dir)?;
    }
    Ok(work_dir)
}
