//! C3: request-triggered code coverage accumulation for end-to-end test runs.
//!
//! An end-to-end suite drives a running application over HTTP. Requests that
//! carry a coverage signal (an `X-Codeception-CodeCoverage` header or the
//! `CODECEPTION_CODECOVERAGE` cookie) are recorded, and every recording is
//! merged into one snapshot on disk. A `.../c3/report/<format>` request
//! renders that snapshot.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        C3 Request Flow                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  request ─► RequestContext ─► Route                              │
//! │                                 │                                │
//! │              ┌──────────────────┴──────────────────┐             │
//! │              ▼                                     ▼             │
//! │         Collect                              Report(route)       │
//! │   Accumulator::arm ─► app runs          SessionFactory::load     │
//! │   ArmedSession::finish                  ReportBuilder::build     │
//! │   (lock, merge, write back, unlock)     stream artifact          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Merges from concurrent requests are serialized by an exclusive advisory
//! lock on `<output>/c3tmp/codecoverage.serialized`; recording runs in
//! parallel.

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::missing_const_for_fn
)]

pub mod config;
pub mod coordinator;
pub mod coverage;
pub mod dispatch;
pub mod factory;
pub mod filter;
pub mod middleware;
pub mod report;
pub mod result;
pub mod service;
pub mod signals;

pub use config::{CoverageSettings, ProjectConfig};
pub use coordinator::{Accumulator, ArmedSession};
pub use coverage::{
    CoverageDriver, CoverageSnapshot, CoverageSummary, LineHits, Probe, ProbeDriver, Recording,
    RequestSession,
};
pub use dispatch::{ReportRoute, Route};
pub use factory::{SessionFactory, SnapshotLock, SNAPSHOT_FILE};
pub use filter::{CoverageFilter, FilterRules};
pub use middleware::{coverage_middleware, instrument, CurrentProbe};
pub use report::{ReportBuilder, ReportFormat, ReportWriter, ReportWriters};
pub use result::{C3Error, C3Result};
pub use service::{C3Config, ReportOutcome, Workspace, C3};
pub use signals::{RequestContext, Signal};
