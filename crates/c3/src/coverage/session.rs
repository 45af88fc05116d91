//! Per-request coverage session.

use super::{CoverageDriver, CoverageSnapshot, Probe, Recording};

/// A fresh snapshot plus the recording that feeds it, owned by one request
#[derive(Debug)]
pub struct RequestSession {
    label: String,
    snapshot: CoverageSnapshot,
    recording: Option<Box<dyn Recording>>,
}

impl RequestSession {
    /// Start recording into `snapshot` under `label`
    #[must_use]
    pub fn start(snapshot: CoverageSnapshot, driver: &dyn CoverageDriver, label: &str) -> Self {
        Self {
            label: label.to_string(),
            snapshot,
            recording: Some(driver.start(label)),
        }
    }

    /// Run label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Probe the application records into, if the driver has one
    #[must_use]
    pub fn probe(&self) -> Option<Probe> {
        self.recording.as_ref().and_then(|r| r.probe())
    }

    /// Stop recording and return the finalized snapshot
    #[must_use]
    pub fn stop(mut self) -> CoverageSnapshot {
        if let Some(recording) = self.recording.take() {
            let hits = recording.stop();
            self.snapshot.record(&self.label, &hits);
        }
        self.snapshot
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coverage::ProbeDriver;

    #[test]
    fn test_stop_records_under_label() {
        let session = RequestSession::start(CoverageSnapshot::default(), &ProbeDriver, "checkout");
        let probe = session.probe().unwrap();
        probe.hit("cart.rs", 10);
        probe.declare("cart.rs", [10, 11]);

        assert_eq!(session.label(), "checkout");
        let snapshot = session.stop();
        assert_eq!(snapshot.hit_count("cart.rs", 10), 1);
        assert_eq!(snapshot.hit_count("cart.rs", 11), 0);
        assert!(snapshot.tests().contains("checkout"));
    }

    #[test]
    fn test_stop_without_hits_still_registers_run() {
        let session = RequestSession::start(CoverageSnapshot::default(), &ProbeDriver, "idle");
        let snapshot = session.stop();
        assert!(snapshot.tests().contains("idle"));
        assert_eq!(snapshot.summary().files, 0);
    }
}
