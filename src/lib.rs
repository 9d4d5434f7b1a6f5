pub mod cli;
pub mod constants;
pub mod controller;
pub mod copier;
pub mod encoder;
pub mod error;
pub mod events;
pub mod formats;
pub mod paths;
pub mod probe;
pub mod scanner;
pub mod stats;

pub use controller::{
    CancellationToken, RunContext, RunController, RunHandle, RunOptions, RunReport, RunState,
};
pub use copier::copy_preserving;
pub use encoder::{encode, encode_image, flatten_to_rgb};
pub use error::{CompressionError, Result};
pub use events::{EventSink, RunEvent};
pub use formats::{is_supported_source, SourceFormat};
pub use paths::compute_output_path;
pub use probe::{probe, ProbeOutcome};
pub use scanner::{DirectoryScanner, FileDescriptor};
pub use stats::{ProcessingOutcome, RunStatistics, RunSummary};
