use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("Invalid quality value: {0}. Must be between 0 and 100")]
    InvalidQuality(u8),

    #[error("Path {path} is not under input root {root}")]
    Path { path: PathBuf, root: PathBuf },

    #[error("Failed to scan {path}: {reason}")]
    Scan { path: PathBuf, reason: String },

    #[error("Failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("Failed to copy {path}: {reason}")]
    Copy { path: PathBuf, reason: String },

    #[error("Invalid input root {path}: {reason}")]
    StartupValidation { path: PathBuf, reason: String },

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("Run worker terminated unexpectedly")]
    WorkerPanicked,
}

impl From<walkdir::Error> for CompressionError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
        CompressionError::Scan {
            path,
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
