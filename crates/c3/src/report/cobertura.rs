//! Cobertura XML writer.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">
//! <coverage line-rate="0.75" branch-rate="0" lines-covered="3" lines-valid="4" ...>
//!   <packages>
//!     <package name="src" line-rate="0.6667" branch-rate="0" complexity="0">
//!       <classes>
//!         <class name="app" filename="src/app.rs" line-rate="0.6667">
//!           <lines>
//!             <line number="1" hits="1"/>
//!           </lines>
//!         </class>
//!       </classes>
//!     </package>
//!   </packages>
//! </coverage>
//! ```

use super::{escape, package_of, ReportWriter};
use crate::coverage::{CoverageSnapshot, FileCoverage};
use crate::result::C3Result;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

/// Files grouped by package (directory)
type PackageMap<'a> = BTreeMap<&'a str, Vec<&'a str>>;

/// Cobertura XML report writer
#[derive(Debug, Clone)]
pub struct CoberturaWriter {
    version: String,
}

impl Default for CoberturaWriter {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl CoberturaWriter {
    /// Set the version string
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Generate Cobertura XML report as a string
    #[must_use]
    pub fn generate(&self, snapshot: &CoverageSnapshot, timestamp: i64) -> String {
        let summary = snapshot.summary();
        let packages = Self::group_by_package(snapshot);
        let line_rate = summary.coverage_percent / 100.0;

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<!DOCTYPE coverage SYSTEM "http://cobertura.sourceforge.net/xml/coverage-04.dtd">"#,
        );
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<coverage line-rate="{:.4}" branch-rate="0" lines-covered="{}" lines-valid="{}" branches-covered="0" branches-valid="0" complexity="0" version="{}" timestamp="{}">"#,
            line_rate,
            summary.covered_lines,
            summary.executable_lines,
            escape(&self.version),
            timestamp,
        );
        xml.push_str("  <sources>\n    <source>.</source>\n  </sources>\n");
        xml.push_str("  <packages>\n");

        for (package_name, files) in &packages {
            let package_rate = Self::package_coverage(snapshot, files).rate();
            let _ = writeln!(
                xml,
                r#"    <package name="{}" line-rate="{:.4}" branch-rate="0" complexity="0">"#,
                escape(package_name),
                package_rate
            );
            xml.push_str("      <classes>\n");

            for file in files {
                let file_rate = snapshot.file_coverage(file).rate();
                let _ = writeln!(
                    xml,
                    r#"        <class name="{}" filename="{}" line-rate="{:.4}" branch-rate="0" complexity="0">"#,
                    escape(&Self::extract_class_name(file)),
                    escape(file),
                    file_rate
                );
                xml.push_str("          <methods/>\n");
                xml.push_str("          <lines>\n");
                for (line, labels) in snapshot.lines(file).into_iter().flatten() {
                    let _ = writeln!(
                        xml,
                        r#"            <line number="{}" hits="{}"/>"#,
                        line,
                        labels.len()
                    );
                }
                xml.push_str("          </lines>\n");
                xml.push_str("        </class>\n");
            }

            xml.push_str("      </classes>\n");
            xml.push_str("    </package>\n");
        }

        xml.push_str("  </packages>\n");
        xml.push_str("</coverage>\n");
        xml
    }

    /// Group files by package (directory)
    fn group_by_package(snapshot: &CoverageSnapshot) -> PackageMap<'_> {
        let mut packages: PackageMap<'_> = BTreeMap::new();
        for (file, _) in snapshot.files() {
            packages.entry(package_of(file)).or_default().push(file);
        }
        packages
    }

    /// Extract class name from file path
    fn extract_class_name(file_path: &str) -> String {
        let name = file_path
            .rsplit_once('/')
            .map_or(file_path, |(_, name)| name);
        name.rsplit_once('.')
            .map_or(name, |(stem, _)| stem)
            .to_string()
    }

    /// Calculate coverage for a package
    fn package_coverage(snapshot: &CoverageSnapshot, files: &[&str]) -> FileCoverage {
        files
            .iter()
            .map(|file| snapshot.file_coverage(file))
            .fold(
                FileCoverage {
                    covered: 0,
                    executable: 0,
                },
                |acc, f| FileCoverage {
                    covered: acc.covered + f.covered,
                    executable: acc.executable + f.executable,
                },
            )
    }
}

impl ReportWriter for CoberturaWriter {
    fn write(&self, snapshot: &CoverageSnapshot, target: &Path) -> C3Result<()> {
        let content = self.generate(snapshot, chrono::Utc::now().timestamp());
        std::fs::write(target, content)?;
        Ok(())
    }
}
