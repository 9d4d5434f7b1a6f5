use crate::constants::TARGET_EXTENSION;
use crate::error::{CompressionError, Result};
use std::path::{Path, PathBuf};

/// Computes where a source file's re-encoded copy is written.
///
/// Without an output root the result sits next to the source with the target
/// extension, so a source that already ends in `.jpeg` maps onto itself and
/// callers must compare the two before deleting anything. With an output root
/// the source's position relative to `input_root` is mirrored underneath it.
///
/// # Returns
/// * `Ok(path)` - The destination path; no directories are created
/// * `Err(CompressionError::Path)` - If an output root is given and `source`
///   does not live under `input_root`
pub fn compute_output_path(
    input_root: &Path,
    output_root: Option<&Path>,
    source: &Path,
) -> Result<PathBuf> {
    match output_root {
        None => Ok(source.with_extension(TARGET_EXTENSION)),
        Some(root) => {
            let relative = relative_to(input_root, source)?;
            Ok(root.join(relative).with_extension(TARGET_EXTENSION))
        }
    }
}

/// `source` expressed relative to `input_root`.
pub fn relative_to(input_root: &Path, source: &Path) -> Result<PathBuf> {
    source
        .strip_prefix(input_root)
        .map(Path::to_path_buf)
        .map_err(|_| CompressionError::Path {
            path: source.to_path_buf(),
            root: input_root.to_path_buf(),
        })
}
