//! End-to-end pipeline behavior: bounds filtering, fetch failures,
//! detection precedence, and fatal import conditions.

use labelpack::archive::{Archive, ArchiveBuilder};
use labelpack::dataset::{Annotation, BBoxXYWH, FileId, ImageFile};
use labelpack::export::{export_dataset, export_snapshot, BinarySource, ExportOptions};
use labelpack::formats::DatasetFormat;
use labelpack::import::import_archive;
use labelpack::LabelpackError;

mod common;
use common::sample_dataset;

#[test]
fn out_of_bounds_annotations_are_excluded_not_clamped() {
    let mut dataset = sample_dataset();
    // Spills past the right edge of the 100x100 image.
    dataset
        .annotations
        .get_mut(&FileId(1))
        .expect("file 1 annotations")
        .push(Annotation::new(
            99u64,
            0u64,
            BBoxXYWH::from_xywh(80.0, 10.0, 40.0, 20.0),
        ));

    let outcome = export_snapshot(
        DatasetFormat::Yolo,
        &dataset,
        &ExportOptions::default(),
    );

    // The offending annotation is missing from both the count and the
    // archive; nothing was clamped into place.
    assert_eq!(outcome.stats.annotations, 3);
    let archive =
        Archive::from_bytes(&outcome.archive.expect("archive bytes")).expect("decode archive");
    let labels = archive.text("labels/img_a.txt").expect("label file");
    assert_eq!(labels.lines().count(), 2);
    for line in labels.lines() {
        assert!(!line.contains("1.200000"), "clamped or spilled value: {line}");
    }
}

#[test]
fn file_left_with_no_annotations_after_filtering_is_skipped() {
    let mut dataset = sample_dataset();
    // img_b's only annotation goes out of bounds.
    dataset.annotations.insert(
        FileId(2),
        vec![Annotation::new(
            3u64,
            0u64,
            BBoxXYWH::from_xywh(0.0, 0.0, 100.0, 100.0),
        )],
    );

    let outcome = export_snapshot(
        DatasetFormat::Yolo,
        &dataset,
        &ExportOptions::default(),
    );
    assert_eq!(outcome.stats.files, 1);
    assert_eq!(outcome.stats.annotations, 2);

    let archive =
        Archive::from_bytes(&outcome.archive.expect("archive bytes")).expect("decode archive");
    assert!(archive.bytes("images/img_b.bmp").is_none());
}

/// A source that fails for one named file and serves embedded bytes for
/// the rest.
struct FlakySource<'a> {
    failing_name: &'a str,
}

impl BinarySource for FlakySource<'_> {
    fn fetch(&self, file: &ImageFile) -> Result<Vec<u8>, String> {
        if file.name == self.failing_name {
            return Err("connection reset".to_string());
        }
        labelpack::export::EmbeddedSource.fetch(file)
    }
}

#[test]
fn fetch_failures_exclude_only_the_affected_file() {
    let dataset = sample_dataset();
    let source = FlakySource {
        failing_name: "img_a.bmp",
    };

    let outcome = export_dataset(
        DatasetFormat::Coco,
        &dataset.files,
        &dataset.annotations,
        &dataset.categories,
        &source,
        &ExportOptions::default(),
    );

    assert!(outcome.success, "partial failure must not fail the export");
    assert_eq!(outcome.stats.failed, 1);
    assert_eq!(outcome.stats.files, 1);
    assert!(outcome.message.contains("1 file(s) failed"));

    let archive =
        Archive::from_bytes(&outcome.archive.expect("archive bytes")).expect("decode archive");
    assert!(archive.bytes("images/img_a.bmp").is_none());
    assert!(archive.bytes("images/img_b.bmp").is_some());
}

#[test]
fn undetermined_archive_yields_no_partial_dataset() {
    let mut builder = ArchiveBuilder::new();
    builder.add_text("notes.txt", "nothing to see here");
    builder.add_text("data/blob.bin", "xx");
    let bytes = builder.finish().expect("build archive");

    let err = import_archive(&bytes).unwrap_err();
    assert!(matches!(err, LabelpackError::FormatUndetermined));
}

#[test]
fn corrupt_archive_is_fatal() {
    let err = import_archive(b"definitely not a zip").unwrap_err();
    assert!(matches!(err, LabelpackError::ArchiveRead { .. }));
}

#[test]
fn archive_with_no_importable_images_fails_validation() {
    // A structurally-YOLO archive whose only image cannot be decoded.
    let mut builder = ArchiveBuilder::new();
    builder.add_text("images/broken.jpg", "not an image");
    builder.add_text("labels/broken.txt", "0 0.5 0.5 0.5 0.5");
    builder.add_text("classes.txt", "crane");
    let bytes = builder.finish().expect("build archive");

    let err = import_archive(&bytes).unwrap_err();
    assert!(matches!(err, LabelpackError::ValidationFailed { .. }));
}

#[test]
fn readme_fallback_classifies_by_keyword_order() {
    // No structural signature, but the manifest names the format.
    let mut builder = ArchiveBuilder::new();
    builder.add_text(
        "README.md",
        "# PASCAL VOC Dataset Export\nexported by an annotation tool\n",
    );
    builder.add_text("extra/readme_data.bin", "x");
    let archive = Archive::from_bytes(&builder.finish().expect("build")).expect("decode");

    let format = labelpack::formats::detect_format(&archive).expect("detect");
    assert_eq!(format, DatasetFormat::PascalVoc);
}

#[test]
fn exported_archives_of_all_formats_redetect_as_themselves() {
    let dataset = sample_dataset();
    for format in DatasetFormat::ALL {
        let outcome = export_snapshot(format, &dataset, &ExportOptions::default());
        let imported =
            import_archive(&outcome.archive.expect("archive bytes")).expect("import");
        assert_eq!(imported.format, format, "format {format} did not roundtrip");
    }
}
