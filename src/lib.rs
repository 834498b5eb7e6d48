//! Labelpack: the dataset codec layer for annotation tools.
//!
//! Labelpack converts object-detection annotation datasets between YOLO,
//! COCO, and PASCAL VOC interchange formats, packaged as ZIP archives. An
//! annotation tool exports its working state (files, bounding boxes,
//! categories) as a portable dataset for training, or imports a dataset
//! produced elsewhere back into its working state — detecting the format,
//! parsing it, validating it, and merging it without inventing colliding
//! ids.
//!
//! # Modules
//!
//! - [`dataset`]: the canonical in-memory model all codecs pass through
//! - [`archive`]: in-memory ZIP packaging
//! - [`formats`]: per-format codecs and format detection
//! - [`export`] / [`import`]: the two pipelines
//! - [`validation`]: structural checks on imported fragments
//! - [`merge`]: merge-on-import strategies
//! - [`stats`]: dataset statistics
//! - [`error`]: error types for labelpack operations

pub mod archive;
pub mod dataset;
pub mod error;
pub mod export;
pub mod formats;
pub mod import;
pub mod merge;
pub mod stats;
pub mod validation;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::LabelpackError;

/// The labelpack CLI application.
#[derive(Parser)]
#[command(name = "labelpack")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Detect the format of a dataset archive.
    Detect(DetectArgs),
    /// Import a dataset archive and print its statistics.
    Inspect(InspectArgs),
    /// Convert a dataset archive to another format.
    Convert(ConvertArgs),
    /// Merge an imported archive into a base archive.
    Merge(MergeArgs),
}

/// Arguments for the detect subcommand.
#[derive(clap::Args)]
struct DetectArgs {
    /// Dataset archive to classify.
    input: PathBuf,
}

/// Arguments for the inspect subcommand.
#[derive(clap::Args)]
struct InspectArgs {
    /// Dataset archive to inspect.
    input: PathBuf,
}

/// Arguments for the convert subcommand.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Input dataset archive.
    input: PathBuf,

    /// Target format ('yolo', 'coco', or 'voc').
    #[arg(long)]
    to: String,

    /// Output archive path.
    #[arg(short, long)]
    output: PathBuf,

    /// Include files that have no annotations.
    #[arg(long)]
    include_empty: bool,

    /// Write YOLO labels in raw pixel coordinates instead of normalized.
    #[arg(long)]
    pixel_coords: bool,
}

/// Arguments for the merge subcommand.
#[derive(clap::Args)]
struct MergeArgs {
    /// Base dataset archive (the working state).
    base: PathBuf,

    /// Archive to merge into the base.
    incoming: PathBuf,

    /// Merge strategy ('replace', 'append', or 'merge').
    #[arg(long, default_value = "append")]
    strategy: String,

    /// Output format ('yolo', 'coco', or 'voc').
    #[arg(long)]
    to: String,

    /// Output archive path.
    #[arg(short, long)]
    output: PathBuf,
}

/// Run the labelpack CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabelpackError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Detect(args)) => run_detect(args),
        Some(Commands::Inspect(args)) => run_inspect(args),
        Some(Commands::Convert(args)) => run_convert(args),
        Some(Commands::Merge(args)) => run_merge(args),
        None => {
            println!("labelpack {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("The dataset codec layer for annotation tools.");
            println!();
            println!("Run 'labelpack --help' for usage information.");
            Ok(())
        }
    }
}

fn run_detect(args: DetectArgs) -> Result<(), LabelpackError> {
    let bytes = fs::read(&args.input)?;
    let archive = archive::Archive::from_bytes(&bytes)?;
    let format = formats::detect_format(&archive)?;
    println!("{}", format);
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), LabelpackError> {
    let bytes = fs::read(&args.input)?;
    let outcome = import::import_archive(&bytes)?;

    println!("{}", outcome.message);
    print!("{}", outcome.stats);
    if !outcome.errors.is_empty() {
        println!();
        println!("{} item(s) could not be imported:", outcome.errors.len());
        for error in &outcome.errors {
            println!("  {}", error);
        }
    }
    Ok(())
}

fn run_convert(args: ConvertArgs) -> Result<(), LabelpackError> {
    let format: formats::DatasetFormat = args.to.parse()?;
    let bytes = fs::read(&args.input)?;
    let outcome = import::import_archive(&bytes)?;

    let options = export::ExportOptions {
        include_empty: args.include_empty,
        normalize_coords: !args.pixel_coords,
    };
    let exported = export::export_snapshot(format, &outcome.dataset, &options);
    let Some(archive_bytes) = exported.archive else {
        return Err(LabelpackError::ExportFailed(exported.message));
    };

    fs::write(&args.output, archive_bytes)?;
    println!("{}", exported.message);
    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<(), LabelpackError> {
    let strategy: merge::MergeStrategy = args.strategy.parse()?;
    let format: formats::DatasetFormat = args.to.parse()?;

    let base = import::import_archive(&fs::read(&args.base)?)?;
    let incoming = import::import_archive(&fs::read(&args.incoming)?)?;

    let merged = merge::merge_datasets(&base.dataset, &incoming.dataset, strategy);
    println!("{}", merged.report);

    let options = export::ExportOptions {
        include_empty: true,
        ..Default::default()
    };
    let exported = export::export_snapshot(format, &merged.dataset, &options);
    let Some(archive_bytes) = exported.archive else {
        return Err(LabelpackError::ExportFailed(exported.message));
    };

    fs::write(&args.output, archive_bytes)?;
    println!("{}", exported.message);
    Ok(())
}
