//! Dataset export pipeline.
//!
//! All three exporters share one skeleton: fetch binaries for every file
//! (concurrently, best-effort), filter each file's annotations through the
//! bounds invariant, hand the surviving files to the format codec for
//! rendering, then package everything together with a generated manifest.
//!
//! Export never mutates the working dataset, and it degrades gracefully:
//! per-file failures are recorded in the stats and the remaining files
//! still ship. Only an unrecoverable packaging error yields a failure
//! outcome, and even that is returned as a value rather than an `Err`.

use std::collections::BTreeMap;

use log::warn;
use rayon::prelude::*;
use serde::Serialize;

use crate::archive::ArchiveBuilder;
use crate::dataset::{
    Annotation, AnnotationMap, Category, CategoryId, Dataset, FileContent, FileId, ImageFile,
};
use crate::error::LabelpackError;
use crate::formats::DatasetFormat;

/// Options accepted by every exporter.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    /// Include files that end up with zero annotations.
    pub include_empty: bool,

    /// Normalize YOLO coordinates to `[0, 1]`. Ignored by other formats.
    pub normalize_coords: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_empty: false,
            normalize_coords: true,
        }
    }
}

/// Counts aggregated while exporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    /// Files written into the archive.
    pub files: usize,
    /// Annotations written into the archive (bounds-filtered).
    pub annotations: usize,
    /// Files excluded because their binary content could not be fetched.
    pub failed: usize,
}

/// The uniform result of an export call.
///
/// `success` is true even when individual files failed; it only goes false
/// on an unrecoverable packaging error, in which case `archive` is `None`.
#[derive(Clone, Debug)]
pub struct ExportOutcome {
    /// Whether an archive was produced.
    pub success: bool,
    /// Human-readable summary of what happened.
    pub message: String,
    /// The packaged archive bytes, when successful.
    pub archive: Option<Vec<u8>>,
    /// Aggregated counts.
    pub stats: ExportStats,
}

/// Resolves an [`ImageFile`]'s content to raw bytes.
///
/// This is the seam to the binary-fetch transport, which is outside this
/// layer: the annotation tool resolves object URLs, a test resolves
/// embedded bytes. A failed fetch is reported as a plain message and
/// affects that file only.
pub trait BinarySource: Sync {
    /// Fetches the binary content for one file.
    fn fetch(&self, file: &ImageFile) -> Result<Vec<u8>, String>;
}

/// A [`BinarySource`] serving files whose content is already in memory.
///
/// This is the source used when re-exporting imported data, where every
/// file carries [`FileContent::Bytes`].
pub struct EmbeddedSource;

impl BinarySource for EmbeddedSource {
    fn fetch(&self, file: &ImageFile) -> Result<Vec<u8>, String> {
        match &file.content {
            FileContent::Bytes(bytes) if !bytes.is_empty() => Ok(bytes.clone()),
            FileContent::Bytes(_) => Err("embedded content is empty".to_string()),
            FileContent::Reference(reference) => Err(format!(
                "no transport available for reference '{}'",
                reference
            )),
        }
    }
}

/// A file that survived fetching and annotation filtering, ready to render.
pub(crate) struct PreparedFile<'a> {
    pub file: &'a ImageFile,
    pub bytes: Vec<u8>,
    /// Annotations that passed the bounds invariant, in input order.
    pub annotations: Vec<&'a Annotation>,
}

/// Everything a format codec needs to render archive entries.
pub(crate) struct ExportJob<'a> {
    pub files: Vec<PreparedFile<'a>>,
    pub categories: &'a [Category],
    pub options: &'a ExportOptions,
}

impl ExportJob<'_> {
    /// Maps category ids to their 0-based list positions.
    pub(crate) fn category_positions(&self) -> BTreeMap<CategoryId, usize> {
        self.categories
            .iter()
            .enumerate()
            .map(|(index, category)| (category.id, index))
            .collect()
    }
}

/// Exports a working dataset as an archive in the given format.
///
/// `files`, `annotations`, and `categories` are borrowed from the caller's
/// working state and never mutated. Binary content is resolved through
/// `source`; fetches for the whole batch are fanned out concurrently and
/// joined, with each failure confined to its own file.
pub fn export_dataset(
    format: DatasetFormat,
    files: &[ImageFile],
    annotations: &AnnotationMap,
    categories: &[Category],
    source: &dyn BinarySource,
    options: &ExportOptions,
) -> ExportOutcome {
    // Concurrent fan-out: every file gets its own result slot keyed by id,
    // so sibling fetches never contend and a failure cancels nothing.
    let mut fetched: BTreeMap<FileId, Result<Vec<u8>, String>> = files
        .par_iter()
        .map(|file| (file.id, source.fetch(file)))
        .collect();

    let mut stats = ExportStats::default();
    let mut prepared = Vec::new();

    // Sequential from here on, in input file order.
    for file in files {
        let bytes = match fetched.remove(&file.id) {
            Some(Ok(bytes)) => bytes,
            Some(Err(reason)) => {
                warn!("skipping file {}: {}", file.name, reason);
                stats.failed += 1;
                continue;
            }
            None => {
                warn!("skipping file {}: no fetch result", file.name);
                stats.failed += 1;
                continue;
            }
        };

        let surviving: Vec<&Annotation> = annotations
            .get(&file.id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(|annotation| {
                let ok = annotation
                    .bbox
                    .fits_within(file.width as f64, file.height as f64);
                if !ok {
                    warn!(
                        "dropping out-of-bounds annotation {} on file {}",
                        annotation.id, file.name
                    );
                }
                ok
            })
            .collect();

        if surviving.is_empty() && !options.include_empty {
            continue;
        }

        stats.files += 1;
        stats.annotations += surviving.len();
        prepared.push(PreparedFile {
            file,
            bytes,
            annotations: surviving,
        });
    }

    let job = ExportJob {
        files: prepared,
        categories,
        options,
    };

    match package(format, &job, &stats, categories.len()) {
        Ok(archive) => ExportOutcome {
            success: true,
            message: export_message(&stats),
            archive: Some(archive),
            stats,
        },
        Err(err) => ExportOutcome {
            success: false,
            message: format!("export failed: {}", err),
            archive: None,
            stats,
        },
    }
}

/// Exports a self-contained dataset (e.g. one produced by import), serving
/// binaries from the files' embedded content.
pub fn export_snapshot(
    format: DatasetFormat,
    dataset: &Dataset,
    options: &ExportOptions,
) -> ExportOutcome {
    export_dataset(
        format,
        &dataset.files,
        &dataset.annotations,
        &dataset.categories,
        &EmbeddedSource,
        options,
    )
}

fn package(
    format: DatasetFormat,
    job: &ExportJob<'_>,
    stats: &ExportStats,
    category_count: usize,
) -> Result<Vec<u8>, LabelpackError> {
    let entries = format.codec().render(job)?;

    let mut builder = ArchiveBuilder::new();
    for (path, bytes) in entries {
        builder.add(path, bytes);
    }
    builder.add_text("README.md", generate_readme(format, stats, category_count));
    builder.finish()
}

fn export_message(stats: &ExportStats) -> String {
    let mut message = format!(
        "exported {} file(s) with {} annotation(s)",
        stats.files, stats.annotations
    );
    if stats.failed > 0 {
        message.push_str(&format!(", {} file(s) failed", stats.failed));
    }
    message
}

/// Renders the informational `README.md` manifest included in every
/// archive.
///
/// The manifest is never parsed back for structural decisions; only its
/// format keyword is used, as a detection fallback. Content is
/// deterministic so identical exports produce identical archives.
fn generate_readme(format: DatasetFormat, stats: &ExportStats, category_count: usize) -> String {
    let mut readme = format!("# {} Dataset Export\n\n", format.name());

    readme.push_str("## Dataset\n\n");
    readme.push_str(&format!("- **Format**: {}\n", format.name()));
    readme.push_str(&format!("- **Files**: {}\n", stats.files));
    readme.push_str(&format!("- **Annotations**: {}\n", stats.annotations));
    readme.push_str(&format!("- **Categories**: {}\n", category_count));
    if stats.failed > 0 {
        readme.push_str(&format!("- **Failed files**: {}\n", stats.failed));
    }

    readme.push_str("\n## Layout\n\n");
    readme.push_str(format_structure(format));
    readme.push_str("\n## Usage\n\n");
    readme.push_str(format_usage(format));
    readme.push_str("\n---\n*Generated by labelpack*\n");
    readme
}

fn format_structure(format: DatasetFormat) -> &'static str {
    match format {
        DatasetFormat::Yolo => {
            "```\ndataset/\n\
             ├── images/           # image files\n\
             ├── labels/           # one label file per image\n\
             ├── classes.txt       # class list\n\
             ├── dataset.yaml      # dataset configuration\n\
             └── README.md\n```\n"
        }
        DatasetFormat::Coco => {
            "```\ndataset/\n\
             ├── images/           # image files\n\
             ├── annotations.json  # COCO annotations\n\
             └── README.md\n```\n"
        }
        DatasetFormat::PascalVoc => {
            "```\ndataset/\n\
             ├── JPEGImages/       # image files\n\
             ├── Annotations/      # one XML file per image\n\
             ├── ImageSets/Main/   # train.txt, trainval.txt\n\
             ├── classes.txt       # class list\n\
             └── README.md\n```\n"
        }
    }
}

fn format_usage(format: DatasetFormat) -> &'static str {
    match format {
        DatasetFormat::Yolo => {
            "Ready for YOLO-family training pipelines. Label coordinates are \
             center-based; see dataset.yaml for the class map.\n"
        }
        DatasetFormat::Coco => {
            "Standard COCO detection layout; annotations.json follows the \
             COCO schema with corner-based pixel boxes.\n"
        }
        DatasetFormat::PascalVoc => {
            "Standard PASCAL VOC layout; every image has a matching XML \
             annotation file.\n"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readme_names_the_format_for_detection_fallback() {
        let stats = ExportStats {
            files: 2,
            annotations: 5,
            failed: 1,
        };
        let readme = generate_readme(DatasetFormat::PascalVoc, &stats, 3);
        assert!(readme.contains("PASCAL VOC"));
        assert!(readme.contains("- **Files**: 2"));
        assert!(readme.contains("- **Failed files**: 1"));
    }

    #[test]
    fn export_message_mentions_failures_only_when_present() {
        let clean = ExportStats {
            files: 3,
            annotations: 7,
            failed: 0,
        };
        assert_eq!(
            export_message(&clean),
            "exported 3 file(s) with 7 annotation(s)"
        );

        let with_failures = ExportStats {
            files: 3,
            annotations: 7,
            failed: 2,
        };
        assert!(export_message(&with_failures).ends_with(", 2 file(s) failed"));
    }
}
