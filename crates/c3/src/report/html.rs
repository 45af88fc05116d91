//! HTML report writer.
//!
//! Writes `index.html` with one row per file and a page per file listing
//! every executable line with the runs that reached it. Source text is shown
//! when the file identity resolves to a readable file under `source_root`.

use super::{escape, page_name, ReportWriter};
use crate::coverage::{CoverageSnapshot, FileCoverage, LineLabels};
use crate::result::C3Result;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

const STYLE: &str = "body{font-family:sans-serif;margin:2em}\
table{border-collapse:collapse}\
td,th{padding:2px 8px;border-bottom:1px solid #ddd;text-align:left}\
.hit{background:#dfd}.miss{background:#fdd}\
pre{margin:0}";

/// HTML report writer
#[derive(Debug, Clone, Default)]
pub struct HtmlWriter {
    source_root: Option<PathBuf>,
}

impl HtmlWriter {
    /// Resolve relative file identities against `root` to embed source text
    #[must_use]
    pub fn with_source_root(root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: Some(root.into()),
        }
    }

    fn index(snapshot: &CoverageSnapshot, generated: &str) -> String {
        let summary = snapshot.summary();
        let mut html = page_head("Code Coverage");
        let _ = writeln!(
            html,
            "<h1>Code Coverage</h1>\n<p>{} of {} lines covered ({:.2}%) by {} runs, generated {}</p>",
            summary.covered_lines,
            summary.executable_lines,
            summary.coverage_percent,
            summary.tests,
            escape(generated),
        );
        html.push_str("<table>\n<tr><th>File</th><th>Lines</th><th>Coverage</th></tr>\n");
        for (index, (file, _)) in snapshot.files().enumerate() {
            let coverage = snapshot.file_coverage(file);
            let _ = writeln!(
                html,
                r#"<tr class="{}"><td><a href="{}">{}</a></td><td>{}/{}</td><td>{:.2}%</td></tr>"#,
                row_class(coverage),
                page_name(index, file, "html"),
                escape(file),
                coverage.covered,
                coverage.executable,
                coverage.rate() * 100.0,
            );
        }
        html.push_str("</table>\n");
        html.push_str("<h2>Runs</h2>\n<ul>\n");
        for label in snapshot.tests() {
            let _ = writeln!(html, "<li>{}</li>", escape(label));
        }
        html.push_str("</ul>\n</body>\n</html>\n");
        html
    }

    fn file_page(&self, file: &str, lines: &LineLabels) -> String {
        let source = self.source_lines(file);
        let mut html = page_head(file);
        let _ = writeln!(
            html,
            r#"<p><a href="index.html">index</a></p><h1>{}</h1>"#,
            escape(file)
        );
        html.push_str("<table>\n<tr><th>Line</th><th>Runs</th><th>Source</th></tr>\n");
        for (line, labels) in lines {
            let class = if labels.is_empty() { "miss" } else { "hit" };
            let runs = labels
                .iter()
                .map(|l| escape(l))
                .collect::<Vec<_>>()
                .join(", ");
            let text = source
                .as_ref()
                .and_then(|src| src.get((*line as usize).saturating_sub(1)))
                .map(|t| escape(t))
                .unwrap_or_default();
            let _ = writeln!(
                html,
                r#"<tr class="{class}"><td>{line}</td><td>{runs}</td><td><pre>{text}</pre></td></tr>"#
            );
        }
        html.push_str("</table>\n</body>\n</html>\n");
        html
    }

    fn source_lines(&self, file: &str) -> Option<Vec<String>> {
        let path = Path::new(file);
        let path = match &self.source_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        };
        let text = fs::read_to_string(path).ok()?;
        Some(text.lines().map(str::to_string).collect())
    }
}

fn page_head(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        escape(title)
    )
}

fn row_class(coverage: FileCoverage) -> &'static str {
    if coverage.covered == coverage.executable {
        "hit"
    } else {
        "miss"
    }
}

impl ReportWriter for HtmlWriter {
    fn write(&self, snapshot: &CoverageSnapshot, target: &Path) -> C3Result<()> {
        let generated = chrono::Utc::now().to_rfc3339();
        fs::write(target.join("index.html"), Self::index(snapshot, &generated))?;
        for (index, (file, lines)) in snapshot.files().enumerate() {
            fs::write(
                target.join(page_name(index, file, "html")),
                self.file_page(file, lines),
            )?;
        }
        Ok(())
    }
}
