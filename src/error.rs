use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for labelpack operations.
///
/// Only fatal conditions appear here: archive codec failures, an
/// unrecognizable archive, a broken COCO manifest, post-parse validation
/// failure, and a bad merge strategy token. Per-file and per-item failures
/// (fetch errors, unreadable images, malformed label lines) are collected
/// into the enclosing outcome's error list instead.
#[derive(Debug, Error)]
pub enum LabelpackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read archive: {source}")]
    ArchiveRead {
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to write archive entry '{path}': {source}")]
    ArchiveWrite {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(
        "could not determine the archive format; expected a YOLO, COCO, or PASCAL VOC dataset"
    )]
    FormatUndetermined,

    #[error("failed to parse COCO manifest '{path}': {source}")]
    CocoJsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("COCO archive is missing an annotations.json manifest")]
    CocoManifestMissing,

    #[error("imported data failed validation with {error_count} error(s)")]
    ValidationFailed {
        error_count: usize,
        report: ValidationReport,
    },

    #[error("unsupported merge strategy: '{0}' (supported: replace, append, merge)")]
    UnknownMergeStrategy(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{0}")]
    ExportFailed(String),
}
