//! Accumulation coordinator.
//!
//! Each armed request moves through `Armed -> Merged`. Arming starts a fresh
//! [`RequestSession`]; teardown stops it and folds it into the persisted
//! snapshot inside the exclusive-lock critical section:
//!
//! 1. stop recording
//! 2. create the snapshot's parent directory
//! 3. lock and read the persisted snapshot
//! 4. merge
//! 5. write back (rewind, overwrite, truncate, flush)
//! 6. unlock, whether or not the write succeeded
//!
//! Only steps 3 to 6 are serialized across requests. Debug-mode sessions are
//! discarded without touching disk.

use crate::coverage::{CoverageDriver, CoverageSnapshot, Probe, RequestSession};
use crate::factory::{SessionFactory, SnapshotLock};
use crate::result::{C3Error, C3Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Starts request sessions and merges them into one snapshot file
#[derive(Debug, Clone)]
pub struct Accumulator {
    factory: SessionFactory,
    driver: Arc<dyn CoverageDriver>,
    snapshot_path: PathBuf,
}

impl Accumulator {
    /// Coordinator persisting to `snapshot_path`
    #[must_use]
    pub fn new(
        factory: SessionFactory,
        driver: Arc<dyn CoverageDriver>,
        snapshot_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            factory,
            driver,
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Persisted snapshot path
    #[must_use]
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Start recording a request under `label`.
    ///
    /// With `debug` set the session is never merged.
    #[must_use]
    pub fn arm(&self, label: &str, debug: bool) -> ArmedSession {
        let session = RequestSession::start(self.factory.fresh(), self.driver.as_ref(), label);
        let is_debug = debug;
        debug!(label, is_debug, "coverage armed");
        ArmedSession {
            session: Some(session),
            accumulator: self.clone(),
            debug,
        }
    }

    /// Run the merge critical section for a finished session
    ///
    /// # Errors
    ///
    /// Returns `DirectoryCreation`, `LockAcquisition`, `CorruptSnapshot` or an
    /// I/O error from the write-back
    pub fn merge(&self, session: RequestSession) -> C3Result<()> {
        let label = session.label().to_string();
        let recorded = session.stop();

        if let Some(parent) = self
            .snapshot_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|e| C3Error::directory_creation(parent, e))?;
        }

        let (mut existing, lock) = self.factory.lock(&self.snapshot_path)?;
        existing.merge(&recorded);
        persist(lock, &existing)?;

        debug!(label, path = %self.snapshot_path.display(), "coverage merged");
        Ok(())
    }
}

/// Write back and unlock, whether or not the write succeeded
fn persist(mut lock: SnapshotLock, snapshot: &CoverageSnapshot) -> C3Result<()> {
    let written = lock.write_back(snapshot);
    lock.release();
    written
}

/// A request whose coverage is being recorded.
///
/// Call [`finish`](Self::finish) when the request is done. If the value is
/// dropped first (handler panic, cancelled future) the merge still runs, and
/// failures are logged.
#[derive(Debug)]
pub struct ArmedSession {
    session: Option<RequestSession>,
    accumulator: Accumulator,
    debug: bool,
}

impl ArmedSession {
    /// Probe for application code, if the driver uses one
    #[must_use]
    pub fn probe(&self) -> Option<Probe> {
        self.session.as_ref().and_then(RequestSession::probe)
    }

    /// Whether this session will be discarded instead of merged
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Stop recording and merge into the persisted snapshot
    ///
    /// # Errors
    ///
    /// See [`Accumulator::merge`]
    pub fn finish(mut self) -> C3Result<()> {
        self.complete()
    }

    fn complete(&mut self) -> C3Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        if self.debug {
            debug!(label = session.label(), "debug mode, coverage discarded");
            let _ = session.stop();
            return Ok(());
        }
        self.accumulator.merge(session)
    }
}

impl Drop for ArmedSession {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            error!(error = %e, "coverage merge failed during teardown");
        }
    }
}
