//! Coordinator facade.
//!
//! [`C3`] ties config resolution, the working directory, the accumulation
//! coordinator and the report builder together for one inbound request. It
//! is transport-agnostic; [`crate::middleware`] adapts it to axum.

use crate::config::ProjectConfig;
use crate::coordinator::{Accumulator, ArmedSession};
use crate::coverage::{CoverageDriver, ProbeDriver};
use crate::dispatch::ReportRoute;
use crate::factory::{SessionFactory, SNAPSHOT_FILE};
use crate::report::{ReportBuilder, ReportFormat, ReportWriters};
use crate::result::{C3Error, C3Result};
use crate::signals::RequestContext;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Error log file name inside the working directory
pub const ERROR_LOG_FILE: &str = "error.txt";

/// Coordinator configuration
#[derive(Debug, Clone)]
pub struct C3Config {
    /// Directory holding `codeception.yml`
    pub config_dir: PathBuf,
    /// Error log location; `<workdir>/error.txt` when unset
    pub error_log_file: Option<PathBuf>,
    /// Compress archived reports
    pub gzip: bool,
    /// Coverage engine
    pub driver: Arc<dyn CoverageDriver>,
    /// Installed report writers
    pub writers: ReportWriters,
}

impl C3Config {
    /// Defaults for a project whose config lives in `config_dir`
    #[must_use]
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            error_log_file: None,
            gzip: cfg!(feature = "gzip"),
            driver: Arc::new(ProbeDriver),
            writers: ReportWriters::builtin(),
        }
    }

    /// Set the error log location
    #[must_use]
    pub fn with_error_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.error_log_file = Some(path.into());
        self
    }

    /// Set gzip compression of archived reports
    #[must_use]
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Set the coverage engine
    #[must_use]
    pub fn with_driver(mut self, driver: impl CoverageDriver + 'static) -> Self {
        self.driver = Arc::new(driver);
        self
    }

    /// Set the report writers
    #[must_use]
    pub fn with_writers(mut self, writers: ReportWriters) -> Self {
        self.writers = writers;
        self
    }
}

/// Result of a report-route request
#[derive(Debug)]
pub enum ReportOutcome {
    /// Working directory emptied
    Cleared,
    /// Rendered artifact
    Artifact {
        /// Format rendered
        format: ReportFormat,
        /// Artifact location
        path: PathBuf,
        /// Artifact contents
        body: Vec<u8>,
    },
    /// Unrecognized action
    Unknown(String),
}

/// Resolved project config plus its (existing) working directory
#[derive(Debug, Clone)]
pub struct Workspace {
    config: ProjectConfig,
    work_dir: PathBuf,
}

impl Workspace {
    /// Project configuration
    #[must_use]
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// `<output>/c3tmp`
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// `<output>/c3tmp/codecoverage.serialized`
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.work_dir.join(SNAPSHOT_FILE)
    }
}

/// Request-triggered coverage coordinator
#[derive(Debug, Clone)]
pub struct C3 {
    config: Arc<C3Config>,
}

impl C3 {
    /// Create a coordinator
    #[must_use]
    pub fn new(config: C3Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Coordinator configuration
    #[must_use]
    pub fn config(&self) -> &C3Config {
        &self.config
    }

    /// Resolve the project config for `ctx` and create the working directory
    ///
    /// # Errors
    ///
    /// Returns `Configuration` or `DirectoryCreation`
    pub fn prepare(&self, ctx: &RequestContext) -> C3Result<Workspace> {
        let config = ProjectConfig::resolve(&self.config.config_dir, ctx)?;
        let work_dir = config.work_dir();
        fs::create_dir_all(&work_dir).map_err(|e| C3Error::directory_creation(&work_dir, e))?;
        Ok(Workspace { config, work_dir })
    }

    /// Start recording an armed collect request
    ///
    /// # Errors
    ///
    /// Returns `Configuration` (missing coverage signal included) or
    /// `DirectoryCreation`
    pub fn arm(&self, ctx: &RequestContext) -> C3Result<ArmedSession> {
        let label = ctx
            .coverage_label()
            .ok_or_else(|| C3Error::configuration("Request is not armed for coverage"))?;
        let workspace = self.prepare(ctx)?;
        let accumulator = self.accumulator(&workspace, ctx.suite())?;
        Ok(accumulator.arm(label, ctx.is_debug()))
    }

    /// Coordinator for `workspace`, with the filter narrowed to `suite`
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for unknown suites or bad patterns
    pub fn accumulator(&self, workspace: &Workspace, suite: Option<&str>) -> C3Result<Accumulator> {
        let filter = workspace.config.coverage_filter(suite)?;
        Ok(Accumulator::new(
            SessionFactory::new(filter),
            Arc::clone(&self.config.driver),
            workspace.snapshot_path(),
        ))
    }

    /// Report builder writing into `work_dir`
    #[must_use]
    pub fn report_builder(&self, work_dir: &Path) -> ReportBuilder {
        ReportBuilder::new(work_dir)
            .with_writers(self.config.writers.clone())
            .with_gzip(self.config.gzip)
    }

    /// Serve a report-route request
    ///
    /// # Errors
    ///
    /// Returns `Configuration`, `DirectoryCreation`, `CorruptSnapshot` or
    /// `ReportGeneration`
    pub fn report(&self, ctx: &RequestContext, route: &ReportRoute) -> C3Result<ReportOutcome> {
        let workspace = self.prepare(ctx)?;
        match route {
            ReportRoute::Clear => {
                clear_dir(workspace.work_dir())?;
                debug!(work_dir = %workspace.work_dir().display(), "coverage cleared");
                Ok(ReportOutcome::Cleared)
            }
            ReportRoute::Unknown(action) => Ok(ReportOutcome::Unknown(action.clone())),
            ReportRoute::Format(ReportFormat::Serialized) => {
                // The live file may be rewritten by a concurrent merge: serve
                // the bytes read under the shared lock, never a second read.
                let path = workspace.snapshot_path();
                let factory = SessionFactory::new(workspace.config.coverage_filter(ctx.suite())?);
                let body = factory
                    .read_bytes(&path)?
                    .filter(|bytes| !bytes.iter().all(u8::is_ascii_whitespace))
                    .ok_or_else(|| {
                        C3Error::report_generation(format!(
                            "No coverage has been collected yet ({})",
                            path.display()
                        ))
                    })?;
                debug!(format = %ReportFormat::Serialized, bytes = body.len(), "report served");
                Ok(ReportOutcome::Artifact {
                    format: ReportFormat::Serialized,
                    path,
                    body,
                })
            }
            ReportRoute::Format(format) => {
                let factory = SessionFactory::new(workspace.config.coverage_filter(ctx.suite())?);
                let snapshot = factory.load(&workspace.snapshot_path())?;
                let path = self.report_builder(workspace.work_dir()).build(*format, &snapshot)?;
                let body = fs::read(&path)?;
                debug!(%format, path = %path.display(), bytes = body.len(), "report built");
                Ok(ReportOutcome::Artifact {
                    format: *format,
                    path,
                    body,
                })
            }
        }
    }

    /// Log a fatal error and return the message for the response header.
    ///
    /// The message goes to the error log when one can be located; if writing
    /// it fails the returned message says so.
    #[must_use]
    pub fn record_error(&self, ctx: &RequestContext, err: &C3Error) -> String {
        let message = err.to_string();
        error!(path = ctx.path(), error = %message, "coverage request failed");

        let Some(log_file) = self.error_log_file(ctx) else {
            return message;
        };
        match write_error_log(&log_file, &message) {
            Ok(()) => message,
            Err(e) => {
                warn!(log = %log_file.display(), error = %e, "error log unwritable");
                C3Error::WritePermission {
                    path: log_file,
                    message,
                }
                .to_string()
            }
        }
    }

    fn error_log_file(&self, ctx: &RequestContext) -> Option<PathBuf> {
        if let Some(path) = &self.config.error_log_file {
            return Some(path.clone());
        }
        ProjectConfig::resolve(&self.config.config_dir, ctx)
            .ok()
            .map(|config| config.work_dir().join(ERROR_LOG_FILE))
    }
}

fn write_error_log(path: &Path, message: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, message)
}

/// Remove everything inside `dir`, keeping `dir` itself
///
/// # Errors
///
/// Returns an I/O error if an entry cannot be removed
pub fn clear_dir(dir: &Path) -> C3Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
