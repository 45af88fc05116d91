//! Merge command handler
//!
//! Folds snapshot files into a target under the same exclusive lock the
//! middleware uses, so it is safe to run while a server is still collecting.

use crate::commands::MergeArgs;
use crate::error::{CliError, CliResult};
use c3::SessionFactory;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Target snapshot
    pub target: PathBuf,
    /// Number of input files merged
    pub inputs: usize,
    /// Distinct run labels in the target afterwards
    pub tests: usize,
}

/// Merge every input snapshot into `args.into`
pub fn execute_merge(args: &MergeArgs) -> CliResult<MergeOutcome> {
    let factory = SessionFactory::default();

    // Decode every input before touching the target.
    let mut inputs = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        if !path.is_file() {
            return Err(CliError::invalid_argument(format!(
                "snapshot '{}' does not exist",
                path.display()
            )));
        }
        inputs.push(factory.load(path)?);
    }

    if let Some(parent) = args.into.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let (mut target, mut lock) = factory.lock(&args.into)?;
    for (path, snapshot) in args.inputs.iter().zip(&inputs) {
        debug!(input = %path.display(), tests = snapshot.tests().len(), "merging");
        target.merge(snapshot);
    }
    lock.write_back(&target)?;
    lock.release();

    info!(into = %args.into.display(), inputs = inputs.len(), "snapshots merged");
    Ok(MergeOutcome {
        target: args.into.clone(),
        inputs: inputs.len(),
        tests: target.tests().len(),
    })
}
