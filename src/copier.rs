use crate::error::{CompressionError, Result};
use filetime::FileTime;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::debug;

/// Copies `source` to `output` byte for byte, carrying over permissions and
/// access/modification times. Used for files that cannot be decoded.
///
/// Like the encoder, the bytes land in a temporary sibling first and are
/// renamed into place. When both paths are the same file there is nothing to
/// copy and the call succeeds without touching the disk.
///
/// # Returns
/// * `Ok(size)` - Number of bytes at `output`
/// * `Err(CompressionError::Copy)` - If reading, writing or renaming fails
pub fn copy_preserving(source: &Path, output: &Path) -> Result<u64> {
    let source_meta = fs::metadata(source).map_err(|e| copy_error(source, e))?;
    if source == output {
        return Ok(source_meta.len());
    }

    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".img-sweep-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| copy_error(source, e))?;

    let mut reader = File::open(source).map_err(|e| copy_error(source, e))?;
    let copied = io::copy(&mut reader, temp.as_file_mut()).map_err(|e| copy_error(source, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| copy_error(source, e))?;

    fs::set_permissions(temp.path(), source_meta.permissions())
        .map_err(|e| copy_error(source, e))?;
    filetime::set_file_times(
        temp.path(),
        FileTime::from_last_access_time(&source_meta),
        FileTime::from_last_modification_time(&source_meta),
    )
    .map_err(|e| copy_error(source, e))?;

    temp.persist(output).map_err(|e| copy_error(source, e.error))?;

    debug!(
        source = %source.display(),
        output = %output.display(),
        bytes = copied,
        "copied verbatim"
    );
    Ok(copied)
}

fn copy_error(path: &Path, err: impl std::fmt::Display) -> CompressionError {
    CompressionError::Copy {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
