pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 0;
pub const MAX_QUALITY: u8 = 100;

/// Files must be strictly larger than this to become candidates.
pub const MIN_CANDIDATE_SIZE: u64 = 2 * 1024 * 1024;

/// Extension every output file is written with.
pub const TARGET_EXTENSION: &str = "jpeg";

/// Worker threads used to stat directory entries during a scan.
pub const SCAN_WORKERS: usize = 4;

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub const SIMULATE_PREFIX: &str = "[simulate]";
pub const SUCCESS_PREFIX: &str = "✓";
pub const WARNING_PREFIX: &str = "⚠";
pub const ERROR_PREFIX: &str = "✗";
