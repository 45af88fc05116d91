//! Include/exclude file filtering.
//!
//! Patterns are `glob` patterns matched against source-file identities as the
//! coverage driver reports them (normally project-relative, e.g. `src/app.rs`).

use crate::result::{C3Error, C3Result};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Serialized form of a [`CoverageFilter`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    /// Files to keep; empty keeps everything
    #[serde(default)]
    pub include: Vec<String>,
    /// Files to drop, applied after `include`
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Compiled include/exclude rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "FilterRules", into = "FilterRules")]
pub struct CoverageFilter {
    rules: FilterRules,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl CoverageFilter {
    /// Filter that accepts every file
    #[must_use]
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Compile include/exclude patterns
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first invalid pattern
    pub fn new(rules: FilterRules) -> C3Result<Self> {
        let include = compile(&rules.include)?;
        let exclude = compile(&rules.exclude)?;
        Ok(Self {
            rules,
            include,
            exclude,
        })
    }

    /// Whether coverage for `file` should be kept
    #[must_use]
    pub fn accepts(&self, file: &str) -> bool {
        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| p.matches_with(file, MATCH_OPTIONS));
        included
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(file, MATCH_OPTIONS))
    }

    /// The source rules
    #[must_use]
    pub fn rules(&self) -> &FilterRules {
        &self.rules
    }
}

impl PartialEq for CoverageFilter {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
    }
}

impl Eq for CoverageFilter {}

impl TryFrom<FilterRules> for CoverageFilter {
    type Error = C3Error;

    fn try_from(rules: FilterRules) -> C3Result<Self> {
        Self::new(rules)
    }
}

impl From<CoverageFilter> for FilterRules {
    fn from(filter: CoverageFilter) -> Self {
        filter.rules
    }
}

fn compile(patterns: &[String]) -> C3Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|raw| {
            Pattern::new(raw).map_err(|e| {
                C3Error::configuration(format!("Invalid coverage pattern '{raw}': {e}"))
            })
        })
        .collect()
}
