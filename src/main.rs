use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveTime};
use clap::Parser;
use crossbeam_channel::Receiver;
use img_sweep::cli::{Args, Commands, RunArgs};
use img_sweep::constants::PROGRESS_BAR_TEMPLATE;
use img_sweep::stats::format_file_size;
use img_sweep::{
    probe, DirectoryScanner, ProbeOutcome, RunContext, RunController, RunEvent, RunOptions,
    RunState, SourceFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Run(run) => run_sweep(run, args.quiet),
        Commands::Scan { input, output } => list_candidates(input, output),
        Commands::Probe { input } => probe_file(&input),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_sweep(args: RunArgs, quiet: bool) -> Result<()> {
    let options = RunOptions::new(args.input, args.output, args.quality)?
        .delete_source(args.delete_source)
        .simulate(args.simulate);

    let (tx, rx) = crossbeam_channel::unbounded();
    let ctx = RunContext::new(tx);
    let token = ctx.cancellation_token();
    ctrlc::set_handler(move || token.cancel()).context("failed to install Ctrl-C handler")?;

    let controller = RunController::new();
    let Some(handle) = controller.start(options, ctx)? else {
        bail!("a run is already in progress");
    };

    render_events(&rx, quiet);

    let report = handle.join()?;
    if report.state == RunState::Aborted {
        eprintln!("⚠️  Run cancelled: {}", report.stats);
    }
    Ok(())
}

/// Draw progress and log lines until the worker hangs up.
fn render_events(rx: &Receiver<RunEvent>, quiet: bool) {
    let progress = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template(PROGRESS_BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);

    for event in rx.iter() {
        match event {
            RunEvent::Log(line) => {
                if !quiet {
                    let line = timestamped(&line, Local::now().time());
                    progress.suspend(|| println!("{}", line));
                }
            }
            RunEvent::Progress { processed, total } => {
                progress.set_length(total as u64);
                progress.set_position(processed as u64);
            }
            RunEvent::Stats(stats) => progress.set_message(stats.to_string()),
            RunEvent::Completed(summary) => {
                progress.finish_with_message(format!("✅ {}", summary));
            }
            RunEvent::Aborted(stats) => progress.abandon_with_message(format!("⏹  {}", stats)),
            RunEvent::Failed(reason) => progress.abandon_with_message(format!("❌ {}", reason)),
        }
    }
}

/// `[HH:MM:SS] line`, wall-clock time of when the line was rendered.
fn timestamped(line: &str, time: NaiveTime) -> String {
    format!("[{}] {}", time.format("%H:%M:%S"), line)
}

fn list_candidates(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    RunOptions::new(&input, output.clone(), None)?.validate()?;

    let candidates = DirectoryScanner::new(&input, output).scan()?;
    if candidates.is_empty() {
        println!("⚠️  No images larger than 2 MiB found under {}", input.display());
        return Ok(());
    }

    let mut total_bytes = 0u64;
    for file in &candidates {
        total_bytes += file.size_bytes;
        let marker = if file.is_in_place() { " (in place)" } else { "" };
        let format = SourceFormat::from_extension(&file.extension)
            .map(|f| f.to_string())
            .unwrap_or_default();
        println!(
            "{:>10}  {:<4}  {} -> {}{}",
            format_file_size(file.size_bytes),
            format,
            file.relative_path.display(),
            file.output_path.display(),
            marker
        );
    }
    println!(
        "📊 {} candidates, {} total",
        candidates.len(),
        format_file_size(total_bytes)
    );
    Ok(())
}

fn probe_file(input: &Path) -> Result<()> {
    if !input.is_file() {
        bail!("file not found: {}", input.display());
    }

    match probe(input) {
        ProbeOutcome::Healthy(img) => {
            println!(
                "✅ {}: healthy ({}x{}, {:?})",
                input.display(),
                img.width(),
                img.height(),
                img.color()
            );
            Ok(())
        }
        ProbeOutcome::Corrupt(reason) => bail!("{} is corrupt: {}", input.display(), reason),
    }
}
