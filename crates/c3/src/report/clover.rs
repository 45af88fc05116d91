//! Clover XML writer.
//!
//! ```xml
//! <coverage generated="1700000000">
//!   <project timestamp="1700000000" name="c3">
//!     <file name="src/app.rs">
//!       <line num="1" type="stmt" count="2"/>
//!       <metrics loc="3" ncloc="3" statements="3" coveredstatements="2" .../>
//!     </file>
//!     <metrics files="1" .../>
//!   </project>
//! </coverage>
//! ```
//!
//! `count` is the number of runs that executed the line.

use super::{escape, ReportWriter};
use crate::coverage::{CoverageSnapshot, FileCoverage};
use crate::result::C3Result;
use std::fmt::Write;
use std::path::Path;

/// Clover XML report writer
#[derive(Debug, Clone, Copy, Default)]
pub struct CloverWriter;

impl CloverWriter {
    /// Generate the report as a string
    #[must_use]
    pub fn generate(snapshot: &CoverageSnapshot, timestamp: i64) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(xml, r#"<coverage generated="{timestamp}">"#);
        let _ = writeln!(xml, r#"  <project timestamp="{timestamp}" name="c3">"#);

        for (file, lines) in snapshot.files() {
            let _ = writeln!(xml, r#"    <file name="{}">"#, escape(file));
            for (line, labels) in lines {
                let _ = writeln!(
                    xml,
                    r#"      <line num="{line}" type="stmt" count="{}"/>"#,
                    labels.len()
                );
            }
            let coverage = snapshot.file_coverage(file);
            let _ = writeln!(xml, "      {}", metrics(coverage, None));
            xml.push_str("    </file>\n");
        }

        let summary = snapshot.summary();
        let totals = FileCoverage {
            covered: summary.covered_lines,
            executable: summary.executable_lines,
        };
        let _ = writeln!(xml, "    {}", metrics(totals, Some(summary.files)));
        xml.push_str("  </project>\n");
        xml.push_str("</coverage>\n");
        xml
    }
}

fn metrics(coverage: FileCoverage, files: Option<usize>) -> String {
    let files = files.map_or_else(String::new, |n| format!(r#"files="{n}" "#));
    format!(
        r#"<metrics {files}loc="{exec}" ncloc="{exec}" classes="0" methods="0" coveredmethods="0" conditionals="0" coveredconditionals="0" statements="{exec}" coveredstatements="{cov}" elements="{exec}" coveredelements="{cov}"/>"#,
        exec = coverage.executable,
        cov = coverage.covered,
    )
}

impl ReportWriter for CloverWriter {
    fn write(&self, snapshot: &CoverageSnapshot, target: &Path) -> C3Result<()> {
        let xml = Self::generate(snapshot, chrono::Utc::now().timestamp());
        std::fs::write(target, xml)?;
        Ok(())
    }
}
