//! Interchange format codecs.
//!
//! Each supported format is one variant of the closed [`DatasetFormat`]
//! enum, backed by a codec implementing detection, parsing, and export
//! rendering. Adding a format means adding one variant and one codec
//! module, not editing a dispatch chain.

pub mod coco;
pub mod detect;
pub mod voc;
pub mod yolo;

pub use detect::detect_format;

use std::fmt;
use std::str::FromStr;

use crate::archive::Archive;
use crate::dataset::Dataset;
use crate::error::LabelpackError;
use crate::export::ExportJob;

/// File extensions recognized as images inside an archive.
pub(crate) const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// The supported dataset interchange formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DatasetFormat {
    Yolo,
    Coco,
    PascalVoc,
}

impl DatasetFormat {
    /// All formats, in detection precedence order.
    ///
    /// The order matters: a YOLO archive carrying a stray
    /// `annotations.json` must still classify as YOLO.
    pub const ALL: [DatasetFormat; 3] =
        [DatasetFormat::Yolo, DatasetFormat::Coco, DatasetFormat::PascalVoc];

    /// Human-readable format name, as written into generated manifests.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetFormat::Yolo => "YOLO",
            DatasetFormat::Coco => "COCO",
            DatasetFormat::PascalVoc => "PASCAL VOC",
        }
    }

    /// The codec backing this format.
    pub(crate) fn codec(&self) -> &'static dyn FormatCodec {
        match self {
            DatasetFormat::Yolo => &yolo::YoloCodec,
            DatasetFormat::Coco => &coco::CocoCodec,
            DatasetFormat::PascalVoc => &voc::VocCodec,
        }
    }
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetFormat {
    type Err = LabelpackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "yolo" => Ok(DatasetFormat::Yolo),
            "coco" => Ok(DatasetFormat::Coco),
            "voc" | "pascal-voc" | "pascal_voc" => Ok(DatasetFormat::PascalVoc),
            other => Err(LabelpackError::UnsupportedFormat(format!(
                "'{}' (supported: yolo, coco, voc)",
                other
            ))),
        }
    }
}

/// The result of parsing an archive: a dataset plus per-item failure
/// descriptions.
///
/// Parse errors never abort the overall parse; each unreadable item is
/// recorded here and skipped.
#[derive(Clone, Debug, Default)]
pub struct DatasetFragment {
    /// The parsed dataset.
    pub dataset: Dataset,
    /// Human-readable per-item failure descriptions.
    pub errors: Vec<String>,
}

/// The per-format codec: structural detection, archive parsing, and export
/// rendering.
pub(crate) trait FormatCodec: Sync {
    /// Returns true if the archive listing matches this format's layout
    /// signature.
    fn matches_listing(&self, listing: &detect::Listing<'_>) -> bool;

    /// Parses archive contents into a dataset fragment.
    fn parse(&self, archive: &Archive) -> Result<DatasetFragment, LabelpackError>;

    /// Renders the format-specific archive entries for an export job,
    /// images included. The shared manifest is appended by the caller.
    fn render(&self, job: &ExportJob<'_>) -> Result<Vec<(String, Vec<u8>)>, LabelpackError>;
}

/// Returns the final path component.
pub(crate) fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Returns true if the path carries a recognized image extension.
pub(crate) fn has_image_extension(path: &str) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    IMAGE_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

/// Decodes image dimensions from raw bytes.
pub(crate) fn blob_dimensions(bytes: &[u8]) -> Result<(u32, u32), String> {
    let size = imagesize::blob_size(bytes).map_err(|source| source.to_string())?;
    let width = u32::try_from(size.width)
        .map_err(|_| format!("image width {} does not fit in u32", size.width))?;
    let height = u32::try_from(size.height)
        .map_err(|_| format!("image height {} does not fit in u32", size.height))?;
    Ok((width, height))
}
