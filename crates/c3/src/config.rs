//! Project configuration discovery.
//!
//! The project is described by `codeception.yml` (or `codeception.dist.yml`)
//! in the config directory. Only the keys C3 needs are read:
//!
//! ```yaml
//! paths:
//!   tests: tests
//!   output: tests/_output
//! coverage:
//!   enabled: true
//!   include: ["src/*"]
//!   exclude: ["src/generated/*"]
//! suites:
//!   api:
//!     coverage:
//!       include: ["src/api/*"]
//! ```
//!
//! A suite may instead live in `<tests>/<name>.suite.yml` or
//! `<tests>/<name>.suite.dist.yml`.

use crate::filter::{CoverageFilter, FilterRules};
use crate::result::{C3Error, C3Result};
use crate::signals::RequestContext;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Primary config file name
pub const CONFIG_FILE: &str = "codeception.yml";

/// Fallback config file name
pub const DIST_CONFIG_FILE: &str = "codeception.dist.yml";

/// Working directory name, created under the output directory
pub const WORK_DIR_NAME: &str = "c3tmp";

const DEFAULT_TESTS_DIR: &str = "tests";
const DEFAULT_OUTPUT_DIR: &str = "tests/_output";

/// Coverage keys of a config file or suite
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CoverageSettings {
    /// Whether coverage is enabled for the project
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Include patterns
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// Exclude patterns
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}

impl CoverageSettings {
    /// Keys set in `suite` replace those of `self`
    #[must_use]
    pub fn overlay(&self, suite: &Self) -> Self {
        Self {
            enabled: suite.enabled.or(self.enabled),
            include: suite.include.clone().or_else(|| self.include.clone()),
            exclude: suite.exclude.clone().or_else(|| self.exclude.clone()),
        }
    }

    /// Include/exclude rules
    #[must_use]
    pub fn rules(&self) -> FilterRules {
        FilterRules {
            include: self.include.clone().unwrap_or_default(),
            exclude: self.exclude.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    coverage: CoverageSettings,
    #[serde(default)]
    suites: BTreeMap<String, RawSuite>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPaths {
    tests: Option<PathBuf>,
    output: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSuite {
    #[serde(default)]
    coverage: CoverageSettings,
}

/// Resolved project configuration
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    config_file: PathBuf,
    project_dir: PathBuf,
    tests_dir: PathBuf,
    output_dir: PathBuf,
    coverage: CoverageSettings,
    suites: BTreeMap<String, CoverageSettings>,
}

impl ProjectConfig {
    /// Locate and load the config for one request
    ///
    /// # Errors
    ///
    /// Returns a configuration error if no config file exists or it is invalid
    pub fn resolve(config_dir: &Path, ctx: &RequestContext) -> C3Result<Self> {
        let file = Self::locate(config_dir, ctx.config_override())?;
        Self::load(&file)
    }

    /// Pick the config file: the requested one, else `codeception.yml`, else
    /// `codeception.dist.yml`.
    ///
    /// An absolute override is used as-is.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if neither candidate exists
    pub fn locate(config_dir: &Path, requested: Option<&str>) -> C3Result<PathBuf> {
        let primary = config_dir.join(requested.unwrap_or(CONFIG_FILE));
        if primary.is_file() {
            return Ok(primary);
        }
        let dist = config_dir.join(DIST_CONFIG_FILE);
        if dist.is_file() {
            return Ok(dist);
        }
        Err(C3Error::configuration(format!(
            "Codecoverage config file '{}' not found",
            primary.display()
        )))
    }

    /// Parse a config file
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file is unreadable or not valid YAML
    pub fn load(path: &Path) -> C3Result<Self> {
        let raw: RawConfig = read_yaml(path)?;
        let project_dir = path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let tests_dir = project_dir.join(
            raw.paths
                .tests
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TESTS_DIR)),
        );
        let output_dir = project_dir.join(
            raw.paths
                .output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        );
        let suites = raw
            .suites
            .into_iter()
            .map(|(name, suite)| (name, suite.coverage))
            .collect();

        Ok(Self {
            config_file: path.to_path_buf(),
            project_dir,
            tests_dir,
            output_dir,
            coverage: raw.coverage,
            suites,
        })
    }

    /// The config file this was loaded from
    #[must_use]
    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Directory containing the config file
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Report/log output directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// C3 working directory (`<output>/c3tmp`)
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.output_dir.join(WORK_DIR_NAME)
    }

    /// Global coverage settings
    #[must_use]
    pub fn coverage(&self) -> &CoverageSettings {
        &self.coverage
    }

    /// Coverage settings of a named suite, layered over the global ones
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the suite is unknown or its file is invalid
    pub fn suite_settings(&self, name: &str) -> C3Result<CoverageSettings> {
        if let Some(suite) = self.suites.get(name) {
            return Ok(self.coverage.overlay(suite));
        }
        for candidate in [
            format!("{name}.suite.yml"),
            format!("{name}.suite.dist.yml"),
        ] {
            let path = self.tests_dir.join(candidate);
            if path.is_file() {
                let suite: RawSuite = read_yaml(&path)?;
                return Ok(self.coverage.overlay(&suite.coverage));
            }
        }
        Err(C3Error::configuration(format!(
            "Suite '{name}' could not be found"
        )))
    }

    /// Filter for new snapshots, narrowed to `suite` when given
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown suites or invalid patterns
    pub fn coverage_filter(&self, suite: Option<&str>) -> C3Result<CoverageFilter> {
        let settings = match suite {
            Some(name) => self.suite_settings(name)?,
            None => self.coverage.clone(),
        };
        CoverageFilter::new(settings.rules())
    }
}

fn read_yaml<T>(path: &Path) -> C3Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    let contents = fs::read_to_string(path).map_err(|e| {
        C3Error::configuration(format!("Unable to read '{}': {e}", path.display()))
    })?;
    if contents.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml_ng::from_str(&contents).map_err(|e| {
        C3Error::configuration(format!("Invalid YAML in '{}': {e}", path.display()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::signals::Signal;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
paths:
  tests: tests
  output: build/output
coverage:
  enabled: true
  include: ["src/*"]
  exclude: ["src/generated/*"]
suites:
  api:
    coverage:
      include: ["src/api/*"]
"#;

    fn project(config: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), config).unwrap();
        dir
    }

    #[test]
    fn test_locate_prefers_primary() {
        let dir = project(CONFIG);
        fs::write(dir.path().join(DIST_CONFIG_FILE), "").unwrap();
        let path = ProjectConfig::locate(dir.path(), None).unwrap();
        assert!(path.ends_with(CONFIG_FILE));
    }

    #[test]
    fn test_locate_falls_back_to_dist() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DIST_CONFIG_FILE), CONFIG).unwrap();
        let path = ProjectConfig::locate(dir.path(), None).unwrap();
        assert!(path.ends_with(DIST_CONFIG_FILE));
    }

    #[test]
    fn test_locate_missing_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = ProjectConfig::locate(dir.path(), None).unwrap_err();
        assert!(matches!(err, C3Error::Configuration { .. }));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_locate_requested_name_and_absolute_path() {
        let dir = project(CONFIG);
        fs::write(dir.path().join("c3.yml"), CONFIG).unwrap();
        let named = ProjectConfig::locate(dir.path(), Some("c3.yml")).unwrap();
        assert!(named.ends_with("c3.yml"));

        let elsewhere = TempDir::new().unwrap();
        let absolute = elsewhere.path().join("custom.yml");
        fs::write(&absolute, CONFIG).unwrap();
        let found =
            ProjectConfig::locate(dir.path(), Some(absolute.to_str().unwrap())).unwrap();
        assert_eq!(found, absolute);
    }

    #[test]
    fn test_load_paths() {
        let dir = project(CONFIG);
        let config = ProjectConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.output_dir(), dir.path().join("build/output"));
        assert_eq!(config.work_dir(), dir.path().join("build/output/c3tmp"));
        assert_eq!(config.coverage().enabled, Some(true));
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let dir = project("");
        let config = ProjectConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.output_dir(), dir.path().join("tests/_output"));
        assert!(config.coverage_filter(None).unwrap().accepts("anything.rs"));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = project("paths: [unclosed");
        let err = ProjectConfig::load(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, C3Error::Configuration { .. }));
    }

    #[test]
    fn test_inline_suite_overrides_include_only() {
        let dir = project(CONFIG);
        let config = ProjectConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        let filter = config.coverage_filter(Some("api")).unwrap();
        assert!(filter.accepts("src/api/users.rs"));
        assert!(!filter.accepts("src/web/home.rs"));
    }

    #[test]
    fn test_suite_file() {
        let dir = project(CONFIG);
        fs::create_dir_all(dir.path().join("tests")).unwrap();
        fs::write(
            dir.path().join("tests/acceptance.suite.yml"),
            "coverage:\n  exclude: [\"src/admin/*\"]\n",
        )
        .unwrap();
        let config = ProjectConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        let filter = config.coverage_filter(Some("acceptance")).unwrap();
        assert!(filter.accepts("src/web/home.rs"));
        assert!(!filter.accepts("src/admin/panel.rs"));
    }

    #[test]
    fn test_unknown_suite() {
        let dir = project(CONFIG);
        let config = ProjectConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        let err = config.coverage_filter(Some("nope")).unwrap_err();
        assert!(err.to_string().contains("Suite 'nope'"));
    }

    #[test]
    fn test_resolve_uses_config_signal() {
        let dir = project("paths:\n  output: default_out\n");
        fs::write(dir.path().join("alt.yml"), "paths:\n  output: alt_out\n").unwrap();
        let ctx = RequestContext::new("/").with_signal(Signal::Config, "alt.yml");
        let config = ProjectConfig::resolve(dir.path(), &ctx).unwrap();
        assert_eq!(config.output_dir(), dir.path().join("alt_out"));
    }
}
