//! Accumulated coverage measurement.
//!
//! A snapshot maps every source file to its executable lines, and every line
//! to the set of run labels that executed it. An empty label set marks a line
//! the driver reported as executable that no run has reached yet.
//!
//! Merging is a per-line set union, so it is commutative, associative and
//! idempotent: the order in which requests reach the merge critical section
//! never changes the result.

use crate::filter::CoverageFilter;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Raw driver output: file -> line -> hit count (0 = executable, not hit)
pub type LineHits = BTreeMap<String, BTreeMap<u32, u64>>;

/// Line -> labels of the runs that executed it
pub type LineLabels = BTreeMap<u32, BTreeSet<String>>;

/// Coverage summary statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSummary {
    /// Number of source files
    pub files: usize,
    /// Number of executable lines
    pub executable_lines: usize,
    /// Number of lines executed by at least one run
    pub covered_lines: usize,
    /// Number of distinct run labels
    pub tests: usize,
    /// Coverage percentage
    pub coverage_percent: f64,
}

/// Per-file coverage figures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileCoverage {
    /// Lines executed by at least one run
    pub covered: usize,
    /// Executable lines
    pub executable: usize,
}

impl FileCoverage {
    /// Covered fraction in `0.0..=1.0`; an empty file counts as fully covered
    #[must_use]
    pub fn rate(self) -> f64 {
        if self.executable == 0 {
            return 1.0;
        }
        self.covered as f64 / self.executable as f64
    }
}

/// Accumulated coverage, persisted as `codecoverage.serialized`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSnapshot {
    #[serde(default)]
    filter: CoverageFilter,
    #[serde(default)]
    files: BTreeMap<String, LineLabels>,
    #[serde(default)]
    tests: BTreeSet<String>,
}

impl CoverageSnapshot {
    /// Create an empty snapshot that keeps only files accepted by `filter`
    #[must_use]
    pub fn new(filter: CoverageFilter) -> Self {
        Self {
            filter,
            files: BTreeMap::new(),
            tests: BTreeSet::new(),
        }
    }

    /// Include/exclude rules applied when recording
    #[must_use]
    pub fn filter(&self) -> &CoverageFilter {
        &self.filter
    }

    /// Fold one finished run into the snapshot
    pub fn record(&mut self, label: &str, hits: &LineHits) {
        let _ = self.tests.insert(label.to_string());
        for (file, lines) in hits {
            if !self.filter.accepts(file) {
                continue;
            }
            let entry = self.files.entry(file.clone()).or_default();
            for (line, count) in lines {
                let labels = entry.entry(*line).or_default();
                if *count > 0 {
                    let _ = labels.insert(label.to_string());
                }
            }
        }
    }

    /// Absorb another snapshot's lines and labels
    pub fn merge(&mut self, other: &Self) {
        for (file, lines) in &other.files {
            let entry = self.files.entry(file.clone()).or_default();
            for (line, labels) in lines {
                entry.entry(*line).or_default().extend(labels.iter().cloned());
            }
        }
        self.tests.extend(other.tests.iter().cloned());
    }

    /// Whether nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.tests.is_empty()
    }

    /// Labels of every run merged so far
    #[must_use]
    pub fn tests(&self) -> &BTreeSet<String> {
        &self.tests
    }

    /// All files with line data
    pub fn files(&self) -> impl Iterator<Item = (&str, &LineLabels)> {
        self.files.iter().map(|(file, lines)| (file.as_str(), lines))
    }

    /// Line data for one file
    #[must_use]
    pub fn lines(&self, file: &str) -> Option<&LineLabels> {
        self.files.get(file)
    }

    /// Lines of `file` executed by at least one run
    #[must_use]
    pub fn covered_lines(&self, file: &str) -> BTreeSet<u32> {
        self.files
            .get(file)
            .map(|lines| {
                lines
                    .iter()
                    .filter(|(_, labels)| !labels.is_empty())
                    .map(|(line, _)| *line)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lines executed by the run `label`, per file
    #[must_use]
    pub fn lines_for(&self, label: &str) -> BTreeMap<String, BTreeSet<u32>> {
        let mut out: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for (file, lines) in &self.files {
            for (line, labels) in lines {
                if labels.contains(label) {
                    let _ = out.entry(file.clone()).or_default().insert(*line);
                }
            }
        }
        out
    }

    /// Number of runs that executed `file:line`
    #[must_use]
    pub fn hit_count(&self, file: &str, line: u32) -> usize {
        self.files
            .get(file)
            .and_then(|lines| lines.get(&line))
            .map_or(0, BTreeSet::len)
    }

    /// Coverage figures for one file
    #[must_use]
    pub fn file_coverage(&self, file: &str) -> FileCoverage {
        self.files.get(file).map_or(
            FileCoverage {
                covered: 0,
                executable: 0,
            },
            file_coverage,
        )
    }

    /// Get coverage summary
    #[must_use]
    pub fn summary(&self) -> CoverageSummary {
        let (covered, executable) = self
            .files
            .values()
            .map(file_coverage)
            .fold((0, 0), |(c, e), f| (c + f.covered, e + f.executable));
        let coverage_percent = if executable == 0 {
            100.0 // Vacuously true
        } else {
            (covered as f64 / executable as f64) * 100.0
        };
        CoverageSummary {
            files: self.files.len(),
            executable_lines: executable,
            covered_lines: covered,
            tests: self.tests.len(),
            coverage_percent,
        }
    }
}

fn file_coverage(lines: &LineLabels) -> FileCoverage {
    FileCoverage {
        covered: lines.values().filter(|labels| !labels.is_empty()).count(),
        executable: lines.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::filter::FilterRules;
    use proptest::prelude::*;

    fn hits(entries: &[(&str, &[(u32, u64)])]) -> LineHits {
        entries
            .iter()
            .map(|(file, lines)| ((*file).to_string(), lines.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_record_first_run() {
        let mut snapshot = CoverageSnapshot::default();
        snapshot.record("run1", &hits(&[("fileA", &[(1, 1), (2, 4), (3, 1)])]));

        let lines = snapshot.lines_for("run1");
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines["fileA"].iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(snapshot.tests().contains("run1"));
    }

    #[test]
    fn test_record_zero_count_is_executable_only() {
        let mut snapshot = CoverageSnapshot::default();
        snapshot.record("run1", &hits(&[("a.rs", &[(1, 1), (2, 0)])]));

        assert_eq!(snapshot.hit_count("a.rs", 1), 1);
        assert_eq!(snapshot.hit_count("a.rs", 2), 0);
        assert_eq!(
            snapshot.file_coverage("a.rs"),
            FileCoverage {
                covered: 1,
                executable: 2
            }
        );
    }

    #[test]
    fn test_record_applies_filter() {
        let filter = CoverageFilter::new(FilterRules {
            include: vec!["src/*".to_string()],
            exclude: vec![],
        })
        .unwrap();
        let mut snapshot = CoverageSnapshot::new(filter);
        snapshot.record(
            "run1",
            &hits(&[("src/app.rs", &[(1, 1)]), ("vendor/x.rs", &[(1, 1)])]),
        );
        assert!(snapshot.lines("src/app.rs").is_some());
        assert!(snapshot.lines("vendor/x.rs").is_none());
    }

    #[test]
    fn test_merge_unions_labels() {
        let mut a = CoverageSnapshot::default();
        a.record("run1", &hits(&[("f.rs", &[(1, 1), (2, 0)])]));
        let mut b = CoverageSnapshot::default();
        b.record("run2", &hits(&[("f.rs", &[(2, 1), (3, 1)])]));

        a.merge(&b);
        assert_eq!(a.hit_count("f.rs", 1), 1);
        assert_eq!(a.hit_count("f.rs", 2), 1);
        assert_eq!(a.hit_count("f.rs", 3), 1);
        assert_eq!(a.tests().len(), 2);
    }

    #[test]
    fn test_merge_same_label_is_not_duplicated() {
        let mut a = CoverageSnapshot::default();
        a.record("login", &hits(&[("f.rs", &[(1, 1)])]));
        let b = a.clone();
        a.merge(&b);
        assert_eq!(a, b);
        assert_eq!(a.hit_count("f.rs", 1), 1);
    }

    #[test]
    fn test_summary() {
        let mut snapshot = CoverageSnapshot::default();
        snapshot.record("r", &hits(&[("a.rs", &[(1, 1), (2, 0)]), ("b.rs", &[(1, 3)])]));
        let summary = snapshot.summary();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.executable_lines, 3);
        assert_eq!(summary.covered_lines, 2);
        assert_eq!(summary.tests, 1);
        assert!((summary.coverage_percent - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_empty_summary_is_vacuously_full() {
        let summary = CoverageSnapshot::default().summary();
        assert_eq!(summary.coverage_percent, 100.0);
        assert!(CoverageSnapshot::default().is_empty());
    }

    #[test]
    fn test_json_reread_is_identical() {
        let mut snapshot = CoverageSnapshot::default();
        snapshot.record("r", &hits(&[("a.rs", &[(1, 1), (2, 0)])]));
        let bytes = serde_json::to_vec(&snapshot).unwrap();
        let first: CoverageSnapshot = serde_json::from_slice(&bytes).unwrap();
        let second: CoverageSnapshot = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, snapshot);
    }

    fn arb_run() -> impl Strategy<Value = (String, LineHits)> {
        (
            "[a-d]",
            prop::collection::btree_map(
                "[a-c]\\.rs",
                prop::collection::btree_map(1u32..20, 0u64..3, 0..6),
                0..3,
            ),
        )
    }

    fn snapshot_of((label, run): &(String, LineHits)) -> CoverageSnapshot {
        let mut snapshot = CoverageSnapshot::default();
        snapshot.record(label, run);
        snapshot
    }

    proptest! {
        #[test]
        fn prop_merge_order_independent(
            runs in prop::collection::vec(arb_run(), 1..6)
        ) {
            let mut forward = CoverageSnapshot::default();
            for run in &runs {
                forward.merge(&snapshot_of(run));
            }
            let mut backward = CoverageSnapshot::default();
            for run in runs.iter().rev() {
                backward.merge(&snapshot_of(run));
            }
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_merge_associative(a in arb_run(), b in arb_run(), c in arb_run()) {
            let (a, b, c) = (snapshot_of(&a), snapshot_of(&b), snapshot_of(&c));

            let mut left = a.clone();
            left.merge(&b);
            left.merge(&c);

            let mut bc = b.clone();
            bc.merge(&c);
            let mut right = a.clone();
            right.merge(&bc);

            prop_assert_eq!(left, right);
        }
    }
}
