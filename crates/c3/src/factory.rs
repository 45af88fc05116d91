//! Coverage session factory.
//!
//! Produces a [`CoverageSnapshot`] either fresh (configured with the
//! include/exclude filter) or read back from the persisted file. In exclusive
//! mode the file stays locked until the returned [`SnapshotLock`] is dropped,
//! which turns read, merge and write-back into one critical section.
//!
//! The lock is an OS advisory lock (`flock` on Unix) held through `fs2`. All
//! processes and threads touching the snapshot go through this module, so the
//! advisory lock is enough to serialize them.

use crate::coverage::CoverageSnapshot;
use crate::filter::CoverageFilter;
use crate::result::{C3Error, C3Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persisted snapshot file name inside the working directory
pub const SNAPSHOT_FILE: &str = "codecoverage.serialized";

/// Builds snapshots for requests, reports and merges
#[derive(Debug, Clone, Default)]
pub struct SessionFactory {
    filter: CoverageFilter,
}

impl SessionFactory {
    /// Factory whose fresh snapshots use `filter`
    #[must_use]
    pub fn new(filter: CoverageFilter) -> Self {
        Self { filter }
    }

    /// Filter applied to fresh snapshots
    #[must_use]
    pub fn filter(&self) -> &CoverageFilter {
        &self.filter
    }

    /// A brand-new empty snapshot
    #[must_use]
    pub fn fresh(&self) -> CoverageSnapshot {
        CoverageSnapshot::new(self.filter.clone())
    }

    /// `factory(path, exclusive)`: fresh snapshot without a path, a locked
    /// read with `exclusive`, a plain read otherwise.
    ///
    /// # Errors
    ///
    /// See [`Self::load`] and [`Self::lock`]
    pub fn open(
        &self,
        path: Option<&Path>,
        exclusive: bool,
    ) -> C3Result<(CoverageSnapshot, Option<SnapshotLock>)> {
        match (path, exclusive) {
            (None, _) => Ok((self.fresh(), None)),
            (Some(path), true) => {
                let (snapshot, lock) = self.lock(path)?;
                Ok((snapshot, Some(lock)))
            }
            (Some(path), false) => Ok((self.load(path)?, None)),
        }
    }

    /// Read the persisted snapshot without retaining a lock.
    ///
    /// A shared lock is held while reading so a concurrent write-back is never
    /// seen half done. A missing, unreadable or empty file yields a fresh
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CorruptSnapshot` if the file holds something undecodable
    pub fn load(&self, path: &Path) -> C3Result<CoverageSnapshot> {
        match self.read_bytes(path)? {
            Some(contents) => self.decode(path, &contents),
            None => Ok(self.fresh()),
        }
    }

    /// Raw persisted bytes, read under a shared lock so a concurrent
    /// write-back is never seen half done. `None` if the file is missing or
    /// unreadable.
    ///
    /// # Errors
    ///
    /// Returns `LockAcquisition` if the shared lock cannot be taken
    pub fn read_bytes(&self, path: &Path) -> C3Result<Option<Vec<u8>>> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no persisted snapshot");
                return Ok(None);
            }
        };
        FileExt::lock_shared(&file).map_err(|e| C3Error::lock_acquisition(path, e))?;
        let contents = read_all(&mut file);
        if let Err(e) = FileExt::unlock(&file) {
            warn!(path = %path.display(), error = %e, "failed to release shared lock");
        }
        contents.map(Some)
    }

    /// Open the persisted snapshot for a read-modify-write cycle.
    ///
    /// The file is created if missing, then exclusively locked (blocking, no
    /// timeout) before anything is read, so two first-ever merges cannot both
    /// see an empty file and overwrite each other.
    ///
    /// # Errors
    ///
    /// Returns `LockAcquisition` if the file cannot be opened or locked, and
    /// `CorruptSnapshot` if its contents are undecodable
    pub fn lock(&self, path: &Path) -> C3Result<(CoverageSnapshot, SnapshotLock)> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| C3Error::lock_acquisition(path, e))?;
        file.lock_exclusive()
            .map_err(|e| C3Error::lock_acquisition(path, e))?;
        let mut lock = SnapshotLock {
            path: path.to_path_buf(),
            file,
        };
        debug!(path = %path.display(), "snapshot locked");

        let contents = read_all(&mut lock.file)?;
        let snapshot = self.decode(path, &contents)?;
        Ok((snapshot, lock))
    }

    fn decode(&self, path: &Path, contents: &[u8]) -> C3Result<CoverageSnapshot> {
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(self.fresh());
        }
        serde_json::from_slice(contents).map_err(|source| C3Error::CorruptSnapshot {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read_all(file: &mut File) -> C3Result<Vec<u8>> {
    let mut contents = Vec::new();
    let _ = file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Exclusive advisory lock on the persisted snapshot.
///
/// Released when dropped, on every exit path.
#[derive(Debug)]
pub struct SnapshotLock {
    path: PathBuf,
    file: File,
}

impl SnapshotLock {
    /// Locked file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with `snapshot`: rewind, overwrite, truncate, flush
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any file operation fails
    pub fn write_back(&mut self, snapshot: &CoverageSnapshot) -> C3Result<()> {
        let bytes = serde_json::to_vec(snapshot)?;
        let _ = self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        self.file.set_len(bytes.len() as u64)?;
        self.file.flush()?;
        self.file.sync_data()?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }

    /// Release the lock now
    pub fn release(self) {
        drop(self);
    }

    /// Lock `path` through a read-only handle, so every write-back fails
    #[cfg(test)]
    pub(crate) fn read_only(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        file.lock_exclusive()?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn unlock(&self) -> io::Result<()> {
        FileExt::unlock(&self.file)
    }
}

impl Drop for SnapshotLock {
    fn drop(&mut self) {
        match self.unlock() {
            Ok(()) => debug!(path = %self.path.display(), "snapshot unlocked"),
            // Closing the descriptor below releases it anyway.
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to unlock snapshot"),
        }
    }
}
