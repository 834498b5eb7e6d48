//! Dataset import pipeline.
//!
//! Import runs a fixed sequence: decode the archive, detect its format,
//! parse it with the matching codec, then validate the resulting fragment.
//! Per-item parse failures are collected into the outcome without aborting
//! anything; only archive decode, format detection, and post-parse
//! validation are fatal.
//!
//! The produced dataset is a fresh fragment — the caller decides whether
//! to replace its working state with it or merge it in (see
//! [`crate::merge`]).

use log::warn;

use crate::archive::Archive;
use crate::dataset::Dataset;
use crate::error::LabelpackError;
use crate::formats::{detect_format, DatasetFormat};
use crate::stats::{dataset_stats, DatasetStats};
use crate::validation::validate_fragment;

/// The result of a successful import.
#[derive(Clone, Debug)]
pub struct ImportOutcome {
    /// The detected archive format.
    pub format: DatasetFormat,
    /// The imported dataset fragment, with fresh dataset-local ids.
    pub dataset: Dataset,
    /// Per-item failure descriptions collected during parsing.
    pub errors: Vec<String>,
    /// Validation warnings (e.g. dangling category references).
    pub warnings: Vec<String>,
    /// Statistics over the imported fragment.
    pub stats: DatasetStats,
    /// Human-readable summary.
    pub message: String,
}

/// Imports a dataset archive from raw bytes.
///
/// # Errors
///
/// - [`LabelpackError::ArchiveRead`] when the archive cannot be decoded.
/// - [`LabelpackError::FormatUndetermined`] when no format signature or
///   manifest keyword matches; nothing is guessed and no partial dataset
///   is returned.
/// - [`LabelpackError::CocoJsonParse`] / [`LabelpackError::CocoManifestMissing`]
///   when a COCO manifest is present but unusable.
/// - [`LabelpackError::ValidationFailed`] when the parsed fragment is
///   structurally unusable.
pub fn import_archive(bytes: &[u8]) -> Result<ImportOutcome, LabelpackError> {
    let archive = Archive::from_bytes(bytes)?;
    let format = detect_format(&archive)?;

    let fragment = format.codec().parse(&archive)?;
    for error in &fragment.errors {
        warn!("import: {}", error);
    }

    let report = validate_fragment(&fragment.dataset);
    for warning in report.warning_messages() {
        warn!("import: {}", warning);
    }
    if !report.is_ok() {
        return Err(LabelpackError::ValidationFailed {
            error_count: report.error_count(),
            report,
        });
    }

    let warnings: Vec<String> = report
        .warning_messages()
        .map(str::to_string)
        .collect();
    let stats = dataset_stats(&fragment.dataset);
    let message = format!(
        "imported {} dataset: {} file(s), {} annotation(s), {} category(s)",
        format.name(),
        stats.total_files,
        stats.total_annotations,
        stats.total_categories
    );

    Ok(ImportOutcome {
        format,
        dataset: fragment.dataset,
        errors: fragment.errors,
        warnings,
        stats,
        message,
    })
}
