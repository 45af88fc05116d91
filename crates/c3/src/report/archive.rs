//! Report archiving.

use crate::result::C3Result;
use std::fs::{self, File};
use std::path::Path;
use tracing::debug;

/// Pack `dir` into `tar_path`, then delete `dir`.
///
/// Any previous archive is removed first. With `gzip` the tar is compressed
/// and written back under the same name.
///
/// # Errors
///
/// Returns an I/O error if archiving, cleanup or compression fails
pub fn pack(dir: &Path, tar_path: &Path, gzip: bool) -> C3Result<()> {
    if tar_path.exists() {
        fs::remove_file(tar_path)?;
    }

    let mut builder = tar::Builder::new(File::create(tar_path)?);
    builder.append_dir_all(".", dir)?;
    builder.into_inner()?.sync_all()?;
    fs::remove_dir_all(dir)?;

    if gzip {
        compress_in_place(tar_path)?;
    }
    debug!(archive = %tar_path.display(), gzip, "report archived");
    Ok(())
}

#[cfg(feature = "gzip")]
fn compress_in_place(path: &Path) -> C3Result<()> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let raw = fs::read(path)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    fs::write(path, encoder.finish()?)?;
    Ok(())
}

#[cfg(not(feature = "gzip"))]
fn compress_in_place(_path: &Path) -> C3Result<()> {
    Ok(())
}
