//! Archive format detection.
//!
//! Classification runs over the archive's file listing only, in a fixed
//! precedence order (YOLO, then COCO, then PASCAL VOC). When no layout
//! signature matches, the generated manifest's text is scanned for format
//! keywords as a last resort. An archive matching neither is a fatal
//! condition; the detector never guesses.

use crate::archive::Archive;
use crate::error::LabelpackError;

use super::{file_name, DatasetFormat};

/// A view over an archive's entry paths with the membership queries
/// detection needs.
pub(crate) struct Listing<'a> {
    paths: Vec<&'a str>,
}

impl<'a> Listing<'a> {
    pub(crate) fn from_archive(archive: &'a Archive) -> Self {
        Self {
            paths: archive.paths().collect(),
        }
    }

    /// True if any entry lives under the given top-level directory.
    pub(crate) fn has_rooted(&self, dir: &str) -> bool {
        self.paths
            .iter()
            .any(|path| path.len() > dir.len() + 1 && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/')
    }

    /// True if the listing contains exactly this top-level entry.
    pub(crate) fn has_top_level(&self, name: &str) -> bool {
        self.paths.iter().any(|path| *path == name)
    }
}

/// Classifies an archive as one of the supported formats.
///
/// Layout signatures are checked first, in [`DatasetFormat::ALL`] order
/// (first match wins); then the manifest keyword fallback, in the same
/// order. Returns [`LabelpackError::FormatUndetermined`] when nothing
/// matches.
pub fn detect_format(archive: &Archive) -> Result<DatasetFormat, LabelpackError> {
    let listing = Listing::from_archive(archive);

    for format in DatasetFormat::ALL {
        if format.codec().matches_listing(&listing) {
            return Ok(format);
        }
    }

    // Last resort: scan a README-style manifest for format keywords.
    let manifest_path = archive
        .find_path(|path| file_name(path).to_ascii_lowercase().contains("readme"))
        .map(str::to_string);
    if let Some(path) = manifest_path {
        if let Some(text) = archive.text(&path) {
            for format in DatasetFormat::ALL {
                if text.contains(format.name()) {
                    return Ok(format);
                }
            }
        }
    }

    Err(LabelpackError::FormatUndetermined)
}
