use std::{
    path::PathBuf,
    process::ExitCode,
    sync::{Arc, atomic::AtomicBool},
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "limbo", version, about = "Maintain Limbo computer-vision datasets")]
struct Cli {
    /// More log output (repeat for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive annotations and reference images from synthetic data.
    Materialize(MaterializeArgs),
    /// Correct problems with dataset(s).
    Lint(LintArgs),
    /// Export instance masks as 8-bit PNGs beside each sample.
    Masks(MasksArgs),
}

#[derive(Args, Debug)]
struct MaterializeArgs {
    /// Materialize everything.
    #[arg(long)]
    all: bool,

    /// Materialize bounding box / bounding polygon metadata.
    #[arg(long)]
    bounds: bool,

    /// Materialize PNG images from the high-dynamic-range renders.
    #[arg(long)]
    images: bool,

    /// Process samples in parallel, one worker per sample.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Dataset director(ies).
    #[arg(required = true)]
    datadir: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct LintArgs {
    /// Remove empty bounding box annotations.
    #[arg(long)]
    delete_empty_bboxes: bool,

    /// Remove samples that don't have cryptomatte data.
    #[arg(long)]
    delete_missing_cryptomatte: bool,

    /// Remove samples that don't have a reference image.
    #[arg(long)]
    delete_missing_image: bool,

    /// Remove samples that don't have synthetic image data.
    #[arg(long)]
    delete_missing_synthetic: bool,

    /// Don't make changes.
    #[arg(long)]
    dry_run: bool,

    /// Dataset director(ies).
    #[arg(required = true)]
    datadir: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct MasksArgs {
    /// Mask name and instance-label regex; repeat for more masks.
    #[arg(long = "mask", num_args = 2, value_names = ["NAME", "PATTERN"], required = true)]
    mask: Vec<String>,

    /// Dataset director(ies).
    #[arg(required = true)]
    datadir: Vec<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Materialize(args) => cmd_materialize(args),
        Command::Lint(args) => cmd_lint(args),
        Command::Masks(args) => cmd_masks(args),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::WARN,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_materialize(args: MaterializeArgs) -> anyhow::Result<ExitCode> {
    let options = limbo::MaterializeOptions {
        bounds: args.all || args.bounds,
        images: args.all || args.images,
        threading: limbo::BatchThreading {
            parallel: args.parallel,
            threads: args.threads,
        },
    };
    if !options.bounds && !options.images {
        tracing::warn!("nothing to do: pass --all, --bounds or --images");
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupt))
        .context("install SIGINT handler")?;

    let dataset = limbo::Dataset::open(&args.datadir)?;
    let report = limbo::materialize_dataset(&dataset, &options, &interrupt)?;
    eprintln!(
        "materialized {} sample(s), skipped {}",
        report.processed, report.skipped
    );
    if report.interrupted {
        eprintln!("interrupted");
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_lint(args: LintArgs) -> anyhow::Result<ExitCode> {
    tracing::info!(roots = ?args.datadir, "linting");
    let options = limbo::LintOptions {
        delete_empty_bboxes: args.delete_empty_bboxes,
        delete_missing_cryptomatte: args.delete_missing_cryptomatte,
        delete_missing_image: args.delete_missing_image,
        delete_missing_synthetic: args.delete_missing_synthetic,
        dry_run: args.dry_run,
    };
    let dataset = limbo::Dataset::open(&args.datadir)?;
    let report = limbo::lint_dataset(&dataset, &options)?;
    eprintln!(
        "inspected {} sample(s): {} empty bbox(es), {} updated, {} deleted, {} skipped",
        report.inspected, report.empty_bboxes, report.updated, report.deleted, report.skipped
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_masks(args: MasksArgs) -> anyhow::Result<ExitCode> {
    let specs = limbo::MaskSpec::parse_pairs(&args.mask)?;
    let dataset = limbo::Dataset::open(&args.datadir)?;
    let report = limbo::export_masks(&dataset, &specs)?;
    eprintln!(
        "wrote {} mask(s), {} sample(s) without cryptomatte, {} skipped",
        report.written, report.without_cryptomatte, report.skipped
    );
    Ok(ExitCode::SUCCESS)
}
