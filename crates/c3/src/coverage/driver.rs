//! Instrumentation engine interface.
//!
//! The coordinator never looks inside a driver: it only starts a recording
//! when a request is armed and stops it at teardown. Drivers need no
//! knowledge of concurrency, since every request owns its own recording.

use super::{LineHits, Probe};
use std::fmt;

/// A coverage-measurement backend
pub trait CoverageDriver: Send + Sync + fmt::Debug {
    /// Begin recording a run labelled `label`
    fn start(&self, label: &str) -> Box<dyn Recording>;
}

/// An in-flight recording owned by exactly one request
pub trait Recording: Send + fmt::Debug {
    /// Finish recording and hand over the collected lines
    fn stop(self: Box<Self>) -> LineHits;

    /// Handle application code records into, if the backend uses one
    fn probe(&self) -> Option<Probe> {
        None
    }
}
