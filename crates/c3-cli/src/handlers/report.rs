//! Report command handler

use super::{load_project, snapshot_source};
use crate::commands::ReportArgs;
use crate::error::{CliError, CliResult};
use c3::{ReportBuilder, ReportFormat, SessionFactory};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Render a persisted snapshot and return the artifact path
pub fn execute_report(args: &ReportArgs) -> CliResult<PathBuf> {
    let format = ReportFormat::from(args.format);
    let source = snapshot_source(args.snapshot.as_ref(), &args.project)?;
    let out_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => load_project(&args.project)?.work_dir(),
    };
    fs::create_dir_all(&out_dir).map_err(|e| {
        CliError::config(format!("cannot create '{}': {e}", out_dir.display()))
    })?;

    let factory = SessionFactory::default();
    let snapshot = factory.load(&source)?;
    debug!(%format, source = %source.display(), tests = snapshot.tests().len(), "rendering");

    let builder = ReportBuilder::new(&out_dir).with_gzip(!args.no_gzip);
    if format == ReportFormat::Serialized && builder.snapshot_path() != source {
        // Exporting: write the snapshot next to the other artifacts.
        let target = builder.snapshot_path();
        let (_, mut lock) = factory.lock(&target)?;
        lock.write_back(&snapshot)?;
        return Ok(target);
    }
    Ok(builder.build(format, &snapshot)?)
}
