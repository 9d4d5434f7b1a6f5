//! Per-run accounting and the small formatting helpers used to report it.
use std::fmt;

/// Aggregate counters for one run. Owned and mutated by the run worker only;
/// observers receive copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatistics {
    pub total_files: usize,
    pub processed_files: usize,
    /// Reported for completeness; no current outcome increments it.
    pub skipped_files: usize,
    pub failed_files: usize,
}

impl RunStatistics {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    /// Account for one finished file. Every outcome counts as processed,
    /// failures are additionally counted as failed.
    pub fn record(&mut self, outcome: &ProcessingOutcome) {
        debug_assert!(self.processed_files < self.total_files);
        self.processed_files += 1;
        if outcome.is_failure() {
            self.failed_files += 1;
        }
    }

    pub fn succeeded(&self) -> usize {
        self.processed_files - self.failed_files
    }

    pub fn is_complete(&self) -> bool {
        self.processed_files == self.total_files
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.total_files,
            succeeded: self.succeeded(),
            failed: self.failed_files,
        }
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {} | processed: {} | skipped: {} | failed: {}",
            self.total_files, self.processed_files, self.skipped_files, self.failed_files
        )
    }
}

/// Terminal counts reported when a run completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files total, {} succeeded, {} failed",
            self.total, self.succeeded, self.failed
        )
    }
}

/// What happened to a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    /// Re-encoded; the value is the size reduction in percent (negative if it grew).
    Compressed(f64),
    /// Could not be decoded and was copied verbatim.
    CopiedCorrupt(String),
    /// Simulate mode: nothing was touched.
    Simulated,
    Failed(String),
}

impl ProcessingOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ProcessingOutcome::Failed(_))
    }
}

/// Percentage saved going from `original_size` to `compressed_size`.
pub fn reduction_percent(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}

/// Human-readable byte count (e.g. "3.2 MB").
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
