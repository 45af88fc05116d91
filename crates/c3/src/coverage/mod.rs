//! Coverage measurement model and engine interface.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  C3 COVERAGE MODEL                                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CoverageDriver ─start(label)─► Recording ─stop()─► LineHits     │
//! │                                     │                  │         │
//! │                                   Probe        RequestSession    │
//! │                                                       │          │
//! │                          CoverageSnapshot ◄─merge()───┘          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod driver;
pub mod probe;
mod session;
mod snapshot;

pub use driver::{CoverageDriver, Recording};
pub use probe::{Probe, ProbeDriver};
pub use session::RequestSession;
pub use snapshot::{CoverageSnapshot, CoverageSummary, FileCoverage, LineHits, LineLabels};
