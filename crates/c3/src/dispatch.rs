//! Request routing.

use crate::report::ReportFormat;

/// Marker that turns a request into a report request
pub const REPORT_ROUTE: &str = "c3/report";

/// Sub-route of `.../c3/report/<action>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRoute {
    /// Empty the working directory
    Clear,
    /// Render and stream a report
    Format(ReportFormat),
    /// Anything else
    Unknown(String),
}

/// What a coverage-armed request should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Run the application with recording on, merge at teardown
    Collect,
    /// Report route
    Report(ReportRoute),
}

impl Route {
    /// Route for a request path
    #[must_use]
    pub fn parse(path: &str) -> Self {
        if !path.contains(REPORT_ROUTE) {
            return Self::Collect;
        }
        let trimmed = path.strip_suffix('/').unwrap_or(path);
        let action = trimmed.rsplit('/').next().unwrap_or_default();
        let route = match action {
            "clear" => ReportRoute::Clear,
            other => other
                .parse()
                .map_or_else(|_| ReportRoute::Unknown(other.to_string()), ReportRoute::Format),
        };
        Self::Report(route)
    }
}
