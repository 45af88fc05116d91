//! Summary command handler

use super::snapshot_source;
use crate::commands::SummaryArgs;
use crate::error::CliResult;
use crate::output::Reporter;
use c3::{CoverageSnapshot, SessionFactory};
use serde::Serialize;

/// Coverage figures of one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow {
    /// Source file
    pub file: String,
    /// Lines executed by at least one run
    pub covered: usize,
    /// Executable lines
    pub executable: usize,
    /// Coverage percentage
    pub percent: f64,
}

/// Printable view of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    /// Distinct run labels
    pub tests: Vec<String>,
    /// Number of files
    pub files: usize,
    /// Executable lines over all files
    pub executable_lines: usize,
    /// Covered lines over all files
    pub covered_lines: usize,
    /// Overall coverage percentage
    pub coverage_percent: f64,
    /// Per-file rows, sorted by path
    pub per_file: Vec<FileRow>,
}

impl SummaryView {
    /// Summarize `snapshot`
    #[must_use]
    pub fn of(snapshot: &CoverageSnapshot) -> Self {
        let summary = snapshot.summary();
        let per_file = snapshot
            .files()
            .map(|(file, _)| {
                let coverage = snapshot.file_coverage(file);
                FileRow {
                    file: file.to_string(),
                    covered: coverage.covered,
                    executable: coverage.executable,
                    percent: coverage.rate() * 100.0,
                }
            })
            .collect();
        Self {
            tests: snapshot.tests().iter().cloned().collect(),
            files: summary.files,
            executable_lines: summary.executable_lines,
            covered_lines: summary.covered_lines,
            coverage_percent: summary.coverage_percent,
            per_file,
        }
    }

    /// Print as text through `reporter`
    pub fn print(&self, reporter: &Reporter) {
        reporter.header("Coverage summary");
        reporter.info(&format!("Runs:  {}", self.tests.len()));
        reporter.info(&format!("Files: {}", self.files));
        reporter.info(&format!(
            "Lines: {}/{} ({})",
            self.covered_lines,
            self.executable_lines,
            reporter.percent(self.coverage_percent)
        ));
        for row in &self.per_file {
            reporter.info(&format!(
                "  {:>8} {:>5}/{:<5} {}",
                reporter.percent(row.percent),
                row.covered,
                row.executable,
                row.file
            ));
        }
    }
}

/// Load the snapshot named by `args` and summarize it
pub fn execute_summary(args: &SummaryArgs) -> CliResult<SummaryView> {
    let source = snapshot_source(args.snapshot.as_ref(), &args.project)?;
    let snapshot = SessionFactory::default().load(&source)?;
    Ok(SummaryView::of(&snapshot))
}
