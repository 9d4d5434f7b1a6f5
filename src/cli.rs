use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "img-sweep",
    about = "Recompress every large image in a directory tree to JPEG",
    long_about = "img-sweep walks a directory tree, picks up JPG, JPEG, PNG and BMP files larger than 2 MiB \
                  and re-encodes them as optimized JPEG files. Transparent images are flattened onto white, \
                  original timestamps are kept, and files that cannot be decoded are copied unchanged.",
    version,
    after_help = "EXAMPLES:\n  \
    img-sweep run ./photos -q 75\n  \
    img-sweep run ./photos -o ./compressed --delete-source\n  \
    img-sweep run ./photos --simulate\n  \
    img-sweep scan ./photos\n  \
    img-sweep probe ./photos/broken.png"
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Show debug diagnostics")]
    pub verbose: bool,

    #[arg(long, global = true, conflicts_with = "verbose", help = "Only show warnings and errors")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(
        about = "Compress all large images under a directory",
        long_about = "Scan the input directory recursively and compress every candidate one by one. \
                      Press Ctrl-C to stop after the file currently being processed."
    )]
    Run(RunArgs),

    #[command(
        about = "List the files a run would process",
        long_about = "Scan the input directory and print every candidate with its size and \
                      destination, without decoding or writing anything."
    )]
    Scan {
        #[arg(help = "Input directory")]
        input: PathBuf,

        #[arg(short, long, help = "Output directory (default: next to each source)")]
        output: Option<PathBuf>,
    },

    #[command(
        about = "Check whether a single image decodes completely",
        long_about = "Fully decode one file and report whether it is healthy or corrupt, \
                      including the decoder's error message."
    )]
    Probe {
        #[arg(help = "Image file path to check")]
        input: PathBuf,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(help = "Input directory to scan recursively")]
    pub input: PathBuf,

    #[arg(
        short,
        long,
        help = "Output directory (default: next to each source)",
        long_help = "Mirror the input directory structure under this directory. \
                     When omitted, each compressed file is written next to its source."
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'q',
        long,
        value_parser = clap::value_parser!(u8).range(0..=100),
        help = "JPEG quality (0-100, default: 80)"
    )]
    pub quality: Option<u8>,

    #[arg(
        short = 'd',
        long,
        help = "Delete each source after it was written successfully",
        long_help = "Remove the original file once its output was written. \
                     A source that is also its own destination is never deleted."
    )]
    pub delete_source: bool,

    #[arg(
        short = 'n',
        long,
        help = "Only report what would happen; touch no files"
    )]
    pub simulate: bool,
}
