//! Terminal output

use console::{style, Term};

/// Styled line writer honouring quiet mode
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(console::colors_enabled(), false)
    }
}

impl Reporter {
    /// Create a reporter writing to stdout
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "OK".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let _ = self.term.write_line(message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line(&styled);
    }

    /// Format a coverage percentage, colored by threshold
    #[must_use]
    pub fn percent(&self, value: f64) -> String {
        let text = format!("{value:.1}%");
        if !self.use_color {
            return text;
        }
        if value >= 80.0 {
            style(text).green().to_string()
        } else if value >= 50.0 {
            style(text).yellow().to_string()
        } else {
            style(text).red().to_string()
        }
    }

    /// Print raw text regardless of quiet mode (machine-readable output)
    pub fn raw(&self, text: &str) {
        let _ = self.term.write_line(text);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_without_color() {
        let reporter = Reporter::new(false, false);
        assert_eq!(reporter.percent(66.666), "66.7%");
        assert_eq!(reporter.percent(100.0), "100.0%");
    }

    #[test]
    fn test_percent_with_color_keeps_value() {
        let reporter = Reporter::new(true, false);
        assert!(reporter.percent(42.0).contains("42.0%"));
    }
}
