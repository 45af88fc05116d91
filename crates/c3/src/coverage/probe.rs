//! Built-in probe driver.
//!
//! Application code marks executed lines with [`hit!`](crate::hit) (or
//! [`Probe::hit`] on a handle taken from the request extensions). The
//! middleware installs the request's probe as a tokio task-local for the
//! duration of the handler, so calls made outside an armed request are no-ops.
//!
//! Task-locals do not follow `tokio::spawn`; pass the `Probe` handle into
//! spawned tasks explicitly.

use super::{CoverageDriver, LineHits, Recording};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

tokio::task_local! {
    static CURRENT: Probe;
}

/// Shared sink for one request's line hits
#[derive(Debug, Clone, Default)]
pub struct Probe {
    hits: Arc<Mutex<LineHits>>,
}

impl Probe {
    /// Create an empty probe
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one execution of `file:line`
    pub fn hit(&self, file: &str, line: u32) {
        let mut hits = self.lock();
        *hits
            .entry(file.to_string())
            .or_default()
            .entry(line)
            .or_insert(0) += 1;
    }

    /// Register executable lines so unreached ones show up as uncovered
    pub fn declare(&self, file: &str, lines: impl IntoIterator<Item = u32>) {
        let mut hits = self.lock();
        let entry = hits.entry(file.to_string()).or_default();
        for line in lines {
            let _ = entry.entry(line).or_insert(0);
        }
    }

    /// Drain everything recorded so far
    #[must_use]
    pub fn take(&self) -> LineHits {
        std::mem::take(&mut *self.lock())
    }

    /// Run `fut` with this probe installed as the current one
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT.scope(self, fut).await
    }

    /// Run `f` with this probe installed as the current one
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT.sync_scope(self, f)
    }

    /// The probe of the armed request running on this task, if any
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT.try_with(Clone::clone).ok()
    }

    fn lock(&self) -> MutexGuard<'_, LineHits> {
        self.hits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Record `file:line` on the current request's probe; no-op when unarmed
pub fn hit(file: &str, line: u32) {
    let _ = CURRENT.try_with(|probe| probe.hit(file, line));
}

/// Declare executable lines on the current request's probe; no-op when unarmed
pub fn declare(file: &str, lines: impl IntoIterator<Item = u32>) {
    let _ = CURRENT.try_with(|probe| probe.declare(file, lines));
}

/// Mark the current source line as executed
#[macro_export]
macro_rules! hit {
    () => {
        $crate::coverage::probe::hit(file!(), line!())
    };
}

/// Driver backed by explicit [`Probe`] calls
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeDriver;

impl CoverageDriver for ProbeDriver {
    fn start(&self, label: &str) -> Box<dyn Recording> {
        tracing::trace!(label, "probe recording started");
        Box::new(ProbeRecording {
            probe: Probe::new(),
        })
    }
}

#[derive(Debug)]
struct ProbeRecording {
    probe: Probe,
}

impl Recording for ProbeRecording {
    fn stop(self: Box<Self>) -> LineHits {
        self.probe.take()
    }

    fn probe(&self) -> Option<Probe> {
        Some(self.probe.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_counts_hits() {
        let probe = Probe::new();
        probe.hit("a.rs", 3);
        probe.hit("a.rs", 3);
        probe.hit("b.rs", 1);
        let hits = probe.take();
        assert_eq!(hits["a.rs"][&3], 2);
        assert_eq!(hits["b.rs"][&1], 1);
        assert!(probe.take().is_empty());
    }

    #[test]
    fn test_declare_does_not_reset_hits() {
        let probe = Probe::new();
        probe.hit("a.rs", 1);
        probe.declare("a.rs", [1, 2, 3]);
        let hits = probe.take();
        assert_eq!(hits["a.rs"][&1], 1);
        assert_eq!(hits["a.rs"][&2], 0);
        assert_eq!(hits["a.rs"].len(), 3);
    }

    #[test]
    fn test_free_functions_are_noop_when_unarmed() {
        hit("a.rs", 1);
        declare("a.rs", [1]);
        assert!(Probe::current().is_none());
    }

    #[test]
    fn test_sync_scope_routes_to_probe() {
        let probe = Probe::new();
        probe.clone().sync_scope(|| {
            hit("a.rs", 7);
            crate::hit!();
        });
        let hits = probe.take();
        assert_eq!(hits["a.rs"][&7], 1);
        assert!(hits.contains_key(file!()));
    }

    #[tokio::test]
    async fn test_async_scope_routes_to_probe() {
        let probe = Probe::new();
        probe
            .clone()
            .scope(async {
                tokio::task::yield_now().await;
                hit("async.rs", 2);
            })
            .await;
        assert_eq!(probe.take()["async.rs"][&2], 1);
    }

    #[test]
    fn test_driver_recording_exposes_probe() {
        let recording = ProbeDriver.start("run1");
        let probe = recording.probe().unwrap();
        probe.hit("x.rs", 5);
        let hits = recording.stop();
        assert_eq!(hits["x.rs"][&5], 1);
    }
}
