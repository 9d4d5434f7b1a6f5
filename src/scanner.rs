use crate::constants::{MIN_CANDIDATE_SIZE, SCAN_WORKERS};
use crate::error::{CompressionError, Result};
use crate::formats::is_supported_source;
use crate::paths::{compute_output_path, relative_to};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// One candidate discovered by a scan. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
    pub output_path: PathBuf,
    pub size_bytes: u64,
    pub modified_time: SystemTime,
    /// Lower-cased source extension
    pub extension: String,
}

impl FileDescriptor {
    /// True when the destination coincides with the source (in-place run of
    /// a file that already has the target extension).
    pub fn is_in_place(&self) -> bool {
        self.source_path == self.output_path
    }
}

/// Walks an input tree and materializes every candidate up front.
///
/// Candidates are regular files with a supported extension that are strictly
/// larger than [`MIN_CANDIDATE_SIZE`]. Nothing is decoded here; corruption is
/// checked later, one file at a time, while processing.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    input_root: PathBuf,
    output_root: Option<PathBuf>,
    workers: usize,
}

impl DirectoryScanner {
    pub fn new(input_root: impl Into<PathBuf>, output_root: Option<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root,
            workers: SCAN_WORKERS,
        }
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    /// Enumerate all candidates, sorted by source path.
    ///
    /// # Returns
    /// * `Ok(candidates)` - Possibly empty, deterministic order
    /// * `Err(CompressionError::Scan)` - If any directory or entry cannot be read
    pub fn scan(&self) -> Result<Vec<FileDescriptor>> {
        let entries = WalkDir::new(&self.input_root)
            .follow_links(false)
            .into_iter()
            .collect::<std::result::Result<Vec<DirEntry>, walkdir::Error>>()?;

        // Symlinks report their own type when not followed, so they drop out here.
        let files: Vec<DirEntry> = entries
            .into_iter()
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| is_supported_source(entry.path()))
            .collect();

        debug!(
            root = %self.input_root.display(),
            supported = files.len(),
            "directory walk finished"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| CompressionError::Scan {
                path: self.input_root.clone(),
                reason: format!("failed to build scan worker pool: {}", e),
            })?;

        let described: Vec<Option<FileDescriptor>> = pool.install(|| {
            files
                .par_iter()
                .map(|entry| self.describe(entry))
                .collect::<Result<Vec<_>>>()
        })?;

        let mut candidates: Vec<FileDescriptor> = described.into_iter().flatten().collect();
        candidates.sort_by(|a, b| a.source_path.cmp(&b.source_path));
        Ok(candidates)
    }

    /// Build a descriptor for one supported file, or `None` if it is too small.
    fn describe(&self, entry: &DirEntry) -> Result<Option<FileDescriptor>> {
        let source_path = entry.path().to_path_buf();
        let metadata = entry.metadata()?;

        let size_bytes = metadata.len();
        if size_bytes <= MIN_CANDIDATE_SIZE {
            return Ok(None);
        }

        let modified_time = metadata.modified().map_err(|e| CompressionError::Scan {
            path: source_path.clone(),
            reason: e.to_string(),
        })?;

        let extension = source_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let relative_path = relative_to(&self.input_root, &source_path)?;
        let output_path =
            compute_output_path(&self.input_root, self.output_root.as_deref(), &source_path)?;

        Ok(Some(FileDescriptor {
            source_path,
            relative_path,
            output_path,
            size_bytes,
            modified_time,
            extension,
        }))
    }
}
