//! PHPUnit XML coverage writer.
//!
//! Produces `index.xml` (totals, runs, one `<file>` per source file) and one
//! XML document per file with `<line nr=".."><covered by=".."/></line>`
//! entries, as consumed by PHPUnit-compatible tooling.

use super::{escape, page_name, ReportWriter};
use crate::coverage::{CoverageSnapshot, FileCoverage, LineLabels};
use crate::result::C3Result;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const NAMESPACE: &str = "https://schema.phpunit.de/coverage/1.0";

/// PHPUnit XML report writer
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpunitWriter;

impl PhpunitWriter {
    fn index(snapshot: &CoverageSnapshot, generated: &str) -> String {
        let summary = snapshot.summary();
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(xml, r#"<phpunit xmlns="{NAMESPACE}">"#);
        let _ = writeln!(
            xml,
            r#"  <build time="{}" phpunit="c3" coverage="{}"/>"#,
            escape(generated),
            env!("CARGO_PKG_VERSION")
        );
        xml.push_str("  <project source=\".\">\n");
        xml.push_str("    <tests>\n");
        for label in snapshot.tests() {
            let _ = writeln!(xml, r#"      <test name="{}" status="0"/>"#, escape(label));
        }
        xml.push_str("    </tests>\n");
        xml.push_str("    <directory name=\"/\">\n");
        let _ = writeln!(
            xml,
            "      {}",
            totals(FileCoverage {
                covered: summary.covered_lines,
                executable: summary.executable_lines,
            })
        );
        for (index, (file, _)) in snapshot.files().enumerate() {
            let _ = writeln!(
                xml,
                r#"      <file name="{}" href="{}">"#,
                escape(file),
                page_name(index, file, "xml")
            );
            let _ = writeln!(xml, "        {}", totals(snapshot.file_coverage(file)));
            xml.push_str("      </file>\n");
        }
        xml.push_str("    </directory>\n");
        xml.push_str("  </project>\n");
        xml.push_str("</phpunit>\n");
        xml
    }

    fn file_document(file: &str, lines: &LineLabels, coverage: FileCoverage) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(xml, r#"<phpunit xmlns="{NAMESPACE}">"#);
        let _ = writeln!(xml, r#"  <file name="{}">"#, escape(file));
        let _ = writeln!(xml, "    {}", totals(coverage));
        xml.push_str("    <coverage>\n");
        for (line, labels) in lines.iter().filter(|(_, labels)| !labels.is_empty()) {
            let _ = writeln!(xml, r#"      <line nr="{line}">"#);
            for label in labels {
                let _ = writeln!(xml, r#"        <covered by="{}"/>"#, escape(label));
            }
            xml.push_str("      </line>\n");
        }
        xml.push_str("    </coverage>\n");
        xml.push_str("  </file>\n");
        xml.push_str("</phpunit>\n");
        xml
    }
}

fn totals(coverage: FileCoverage) -> String {
    format!(
        r#"<totals><lines total="{exec}" comments="0" code="{exec}" executable="{exec}" executed="{cov}" percent="{pct:.2}"/></totals>"#,
        exec = coverage.executable,
        cov = coverage.covered,
        pct = coverage.rate() * 100.0,
    )
}

impl ReportWriter for PhpunitWriter {
    fn write(&self, snapshot: &CoverageSnapshot, target: &Path) -> C3Result<()> {
        let generated = chrono::Utc::now().to_rfc2822();
        fs::write(target.join("index.xml"), Self::index(snapshot, &generated))?;
        for (index, (file, lines)) in snapshot.files().enumerate() {
            let document = Self::file_document(file, lines, snapshot.file_coverage(file));
            fs::write(target.join(page_name(index, file, "xml")), document)?;
        }
        Ok(())
    }
}
