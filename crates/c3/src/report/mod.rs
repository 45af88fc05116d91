//! Report generation.
//!
//! A [`ReportBuilder`] renders a merged snapshot into one of the supported
//! formats inside the working directory:
//!
//! | format       | artifact                                   |
//! |--------------|--------------------------------------------|
//! | `serialized` | `codecoverage.serialized` (the snapshot)   |
//! | `clover`     | `codecoverage.clover.xml`                  |
//! | `crap4j`     | `codecoverage.crap4j.xml`                  |
//! | `cobertura`  | `codecoverage.cobertura.xml`               |
//! | `html`       | `codecoverage.tar` (gzipped when enabled)  |
//! | `phpunit`    | `codecoverage.tar` (gzipped when enabled)  |
//!
//! Writers are looked up in a [`ReportWriters`] registry, so a deployment can
//! install a subset of them.

mod archive;
mod clover;
mod cobertura;
mod crap4j;
mod html;
mod phpunit;

pub use archive::pack;
pub use clover::CloverWriter;
pub use cobertura::CoberturaWriter;
pub use crap4j::Crap4jWriter;
pub use html::HtmlWriter;
pub use phpunit::PhpunitWriter;

use crate::coverage::CoverageSnapshot;
use crate::factory::SNAPSHOT_FILE;
use crate::result::{C3Error, C3Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// File name prefix of every artifact in the working directory
pub const REPORT_PREFIX: &str = "codecoverage";

/// Output formats served on the report route
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportFormat {
    /// Browsable HTML, archived
    Html,
    /// Clover XML
    Clover,
    /// Crap4J XML
    Crap4j,
    /// The persisted snapshot itself
    Serialized,
    /// PHPUnit XML, archived
    Phpunit,
    /// Cobertura XML
    Cobertura,
}

impl ReportFormat {
    /// Every format
    pub const ALL: [Self; 6] = [
        Self::Html,
        Self::Clover,
        Self::Crap4j,
        Self::Serialized,
        Self::Phpunit,
        Self::Cobertura,
    ];

    /// Route segment / file infix
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Clover => "clover",
            Self::Crap4j => "crap4j",
            Self::Serialized => "serialized",
            Self::Phpunit => "phpunit",
            Self::Cobertura => "cobertura",
        }
    }

    /// Whether the format produces a directory that is shipped as a tar
    #[must_use]
    pub const fn is_archived(self) -> bool {
        matches!(self, Self::Html | Self::Phpunit)
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = C3Error;

    fn from_str(s: &str) -> C3Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| C3Error::report_generation(format!("Unknown report format '{s}'")))
    }
}

/// Renders a snapshot to a file (XML formats) or into a directory (archived formats)
pub trait ReportWriter: Send + Sync + fmt::Debug {
    /// Write the report for `snapshot` at `target`
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be written
    fn write(&self, snapshot: &CoverageSnapshot, target: &Path) -> C3Result<()>;
}

/// Installed report writers, keyed by format
#[derive(Debug, Clone, Default)]
pub struct ReportWriters {
    writers: BTreeMap<ReportFormat, Arc<dyn ReportWriter>>,
}

impl ReportWriters {
    /// No writers at all
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// All built-in writers
    #[must_use]
    pub fn builtin() -> Self {
        Self::empty()
            .with(ReportFormat::Html, HtmlWriter::default())
            .with(ReportFormat::Clover, CloverWriter)
            .with(ReportFormat::Crap4j, Crap4jWriter::default())
            .with(ReportFormat::Phpunit, PhpunitWriter)
            .with(ReportFormat::Cobertura, CoberturaWriter::default())
    }

    /// Built-in writers minus Cobertura, as older reporting stacks ship them
    #[must_use]
    pub fn without_cobertura() -> Self {
        Self::builtin().without(ReportFormat::Cobertura)
    }

    /// Install `writer` for `format`
    #[must_use]
    pub fn with(mut self, format: ReportFormat, writer: impl ReportWriter + 'static) -> Self {
        let _ = self.writers.insert(format, Arc::new(writer));
        self
    }

    /// Remove the writer for `format`
    #[must_use]
    pub fn without(mut self, format: ReportFormat) -> Self {
        let _ = self.writers.remove(&format);
        self
    }

    /// Writer for `format`
    #[must_use]
    pub fn get(&self, format: ReportFormat) -> Option<&dyn ReportWriter> {
        self.writers.get(&format).map(AsRef::as_ref)
    }

    /// Whether `format` can be rendered
    #[must_use]
    pub fn supports(&self, format: ReportFormat) -> bool {
        format == ReportFormat::Serialized || self.writers.contains_key(&format)
    }
}

/// Renders report artifacts into a working directory
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    writers: ReportWriters,
    work_dir: PathBuf,
    gzip: bool,
}

impl ReportBuilder {
    /// Builder writing into `work_dir` with the built-in writers
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            writers: ReportWriters::builtin(),
            work_dir: work_dir.into(),
            gzip: cfg!(feature = "gzip"),
        }
    }

    /// Use another writer registry
    #[must_use]
    pub fn with_writers(mut self, writers: ReportWriters) -> Self {
        self.writers = writers;
        self
    }

    /// Compress archives (ignored without the `gzip` feature)
    #[must_use]
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip && cfg!(feature = "gzip");
        self
    }

    /// Working directory
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Persisted snapshot path
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.work_dir.join(SNAPSHOT_FILE)
    }

    /// Path of the artifact `format` produces
    #[must_use]
    pub fn artifact_path(&self, format: ReportFormat) -> PathBuf {
        match format {
            ReportFormat::Serialized => self.snapshot_path(),
            ReportFormat::Html | ReportFormat::Phpunit => {
                self.work_dir.join(format!("{REPORT_PREFIX}.tar"))
            }
            _ => self
                .work_dir
                .join(format!("{REPORT_PREFIX}.{}.xml", format.as_str())),
        }
    }

    /// Render `snapshot` as `format` and return the artifact path
    ///
    /// # Errors
    ///
    /// Returns `ReportGeneration` if no writer is installed for `format` (before
    /// anything is written) or the writer fails, and `DirectoryCreation` if the
    /// staging directory cannot be created
    pub fn build(&self, format: ReportFormat, snapshot: &CoverageSnapshot) -> C3Result<PathBuf> {
        debug!(%format, work_dir = %self.work_dir.display(), "building report");

        if format == ReportFormat::Serialized {
            let path = self.snapshot_path();
            if !path.is_file() {
                return Err(C3Error::report_generation(format!(
                    "No coverage has been collected yet ({})",
                    path.display()
                )));
            }
            return Ok(path);
        }

        let writer = self.writers.get(format).ok_or_else(|| {
            C3Error::report_generation(format!(
                "{format} format is not supported by the installed report writers"
            ))
        })?;

        let artifact = self.artifact_path(format);
        if format.is_archived() {
            let staging = self.work_dir.join(format!("{REPORT_PREFIX}{}", format.as_str()));
            if staging.exists() {
                fs::remove_dir_all(&staging)?;
            }
            fs::create_dir_all(&staging)
                .map_err(|e| C3Error::directory_creation(&staging, e))?;
            writer
                .write(snapshot, &staging)
                .map_err(|e| writer_failed(format, e))?;
            pack(&staging, &artifact, self.gzip)?;
        } else {
            writer
                .write(snapshot, &artifact)
                .map_err(|e| writer_failed(format, e))?;
        }
        Ok(artifact)
    }
}

fn writer_failed(format: ReportFormat, err: C3Error) -> C3Error {
    match err {
        C3Error::ReportGeneration { .. } => err,
        other => C3Error::report_generation(format!("{format} writer failed: {other}")),
    }
}

/// Escape text for XML/HTML attribute and element content
pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Page name for the `index`th file of a multi-page report
pub(crate) fn page_name(index: usize, file: &str, ext: &str) -> String {
    let stem: String = file
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{index:04}-{}.{ext}", stem.trim_matches('_'))
}

/// Directory part of a file identity, used as package name
pub(crate) fn package_of(file: &str) -> &str {
    file.rsplit_once('/').map_or("default", |(dir, _)| dir)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::LineHits;
    use tempfile::TempDir;

    pub(super) fn sample() -> CoverageSnapshot {
        let mut hits = LineHits::new();
        let _ = hits.insert("src/app.rs".into(), [(1, 1), (2, 1), (3, 0)].into());
        let _ = hits.insert("src/db/pool.rs".into(), [(10, 2)].into());
        let mut snapshot = CoverageSnapshot::default();
        snapshot.record("run1", &hits);
        snapshot
    }

    #[test]
    fn test_format_roundtrip_names() {
        for format in ReportFormat::ALL {
            assert_eq!(format.as_str().parse::<ReportFormat>().unwrap(), format);
        }
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_artifact_paths() {
        let builder = ReportBuilder::new("/w/c3tmp");
        assert_eq!(
            builder.artifact_path(ReportFormat::Clover),
            Path::new("/w/c3tmp/codecoverage.clover.xml")
        );
        assert_eq!(
            builder.artifact_path(ReportFormat::Crap4j),
            Path::new("/w/c3tmp/codecoverage.crap4j.xml")
        );
        assert_eq!(
            builder.artifact_path(ReportFormat::Html),
            Path::new("/w/c3tmp/codecoverage.tar")
        );
        assert_eq!(
            builder.artifact_path(ReportFormat::Serialized),
            Path::new("/w/c3tmp/codecoverage.serialized")
        );
    }

    #[test]
    fn test_build_clover() {
        let dir = TempDir::new().unwrap();
        let builder = ReportBuilder::new(dir.path());
        let path = builder.build(ReportFormat::Clover, &sample()).unwrap();
        assert!(path.ends_with("codecoverage.clover.xml"));
        assert!(fs::read_to_string(path).unwrap().contains("<coverage"));
    }

    #[test]
    fn test_build_html_leaves_only_archive() {
        let dir = TempDir::new().unwrap();
        let builder = ReportBuilder::new(dir.path());
        let path = builder.build(ReportFormat::Html, &sample()).unwrap();

        assert!(path.is_file());
        assert!(!dir.path().join("codecoveragehtml").exists());
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["codecoverage.tar".to_string()]);
    }

    #[test]
    fn test_cobertura_unsupported_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let builder =
            ReportBuilder::new(dir.path()).with_writers(ReportWriters::without_cobertura());

        let err = builder
            .build(ReportFormat::Cobertura, &sample())
            .unwrap_err();
        assert!(matches!(err, C3Error::ReportGeneration { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_serialized_requires_persisted_snapshot() {
        let dir = TempDir::new().unwrap();
        let builder = ReportBuilder::new(dir.path());
        assert!(builder.build(ReportFormat::Serialized, &sample()).is_err());

        fs::write(builder.snapshot_path(), "{}").unwrap();
        assert_eq!(
            builder.build(ReportFormat::Serialized, &sample()).unwrap(),
            builder.snapshot_path()
        );
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a<b>&"c"'"#), "a&lt;b&gt;&amp;&quot;c&quot;&#39;");
    }

    #[test]
    fn test_page_name_is_flat_and_unique() {
        assert_eq!(page_name(0, "src/a.rs", "html"), "0000-src_a_rs.html");
        assert_ne!(page_name(0, "a/b.rs", "xml"), page_name(1, "a_b.rs", "xml"));
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("src/db/pool.rs"), "src/db");
        assert_eq!(package_of("main.rs"), "default");
    }
}
