//! Crap4J XML writer.
//!
//! Line coverage carries no method boundaries, so each file is reported as a
//! single method of complexity 1. CRAP is `c² · (1 − cov)³ + c`.

use super::{escape, package_of, ReportWriter};
use crate::coverage::CoverageSnapshot;
use crate::result::C3Result;
use std::fmt::Write;
use std::path::Path;

const COMPLEXITY: f64 = 1.0;

/// Crap4J XML report writer
#[derive(Debug, Clone, Copy)]
pub struct Crap4jWriter {
    threshold: f64,
}

impl Default for Crap4jWriter {
    fn default() -> Self {
        Self { threshold: 30.0 }
    }
}

impl Crap4jWriter {
    /// Writer flagging methods whose CRAP score reaches `threshold`
    #[must_use]
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// CRAP score for a method with `complexity` and coverage `rate`
    #[must_use]
    pub fn crap(complexity: f64, rate: f64) -> f64 {
        complexity.powi(2) * (1.0 - rate).powi(3) + complexity
    }

    /// Generate the report as a string
    #[must_use]
    pub fn generate(&self, snapshot: &CoverageSnapshot, timestamp: &str) -> String {
        let mut methods = String::new();
        let mut count = 0usize;
        let mut crappy = 0usize;
        let mut total_crap = 0.0;
        let mut crap_load = 0.0;

        for (file, _) in snapshot.files() {
            let rate = snapshot.file_coverage(file).rate();
            let crap = Self::crap(COMPLEXITY, rate);
            let load = self.crap_load(crap, rate);
            count += 1;
            total_crap += crap;
            crap_load += load;
            if crap >= self.threshold {
                crappy += 1;
            }

            let name = escape(file.rsplit_once('/').map_or(file, |(_, n)| n));
            methods.push_str("    <method>\n");
            let _ = writeln!(methods, "      <package>{}</package>", escape(package_of(file)));
            let _ = writeln!(methods, "      <className>{name}</className>");
            let _ = writeln!(methods, "      <methodName>{name}</methodName>");
            let _ = writeln!(methods, "      <methodSignature>{name}</methodSignature>");
            let _ = writeln!(methods, "      <fullMethod>{}</fullMethod>", escape(file));
            let _ = writeln!(methods, "      <crap>{crap:.2}</crap>");
            let _ = writeln!(methods, "      <complexity>{COMPLEXITY}</complexity>");
            let _ = writeln!(methods, "      <coverage>{:.2}</coverage>", rate * 100.0);
            let _ = writeln!(methods, "      <crapLoad>{load:.0}</crapLoad>");
            methods.push_str("    </method>\n");
        }

        let percent = if count == 0 {
            0.0
        } else {
            crappy as f64 / count as f64 * 100.0
        };

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<crap_result>\n");
        xml.push_str("  <project>c3</project>\n");
        let _ = writeln!(xml, "  <timestamp>{}</timestamp>", escape(timestamp));
        xml.push_str("  <stats>\n");
        xml.push_str("    <name>Method Crap Stats</name>\n");
        let _ = writeln!(xml, "    <methodCount>{count}</methodCount>");
        let _ = writeln!(xml, "    <crapMethodCount>{crappy}</crapMethodCount>");
        let _ = writeln!(xml, "    <crapLoad>{crap_load:.0}</crapLoad>");
        let _ = writeln!(xml, "    <totalCrap>{total_crap:.2}</totalCrap>");
        let _ = writeln!(xml, "    <crapMethodPercent>{percent:.2}</crapMethodPercent>");
        xml.push_str("  </stats>\n");
        xml.push_str("  <methods>\n");
        xml.push_str(&methods);
        xml.push_str("  </methods>\n");
        xml.push_str("</crap_result>\n");
        xml
    }

    /// Tests needed to bring a crappy method under the threshold
    fn crap_load(&self, crap: f64, rate: f64) -> f64 {
        if crap < self.threshold {
            return 0.0;
        }
        COMPLEXITY * (1.0 - rate) + 1.0
    }
}

impl ReportWriter for Crap4jWriter {
    fn write(&self, snapshot: &CoverageSnapshot, target: &Path) -> C3Result<()> {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        std::fs::write(target, self.generate(snapshot, &timestamp))?;
        Ok(())
    }
}
