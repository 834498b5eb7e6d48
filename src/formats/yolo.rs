//! YOLO (Ultralytics-style) archive codec.
//!
//! Layout: `images/` + `labels/` trees, a `classes.txt` class list, a
//! `dataset.yaml` configuration, and the generated `README.md`. One label
//! file per image, one `<class> <cx> <cy> <w> <h>` line per box.
//!
//! Label values are either all normalized to `[0, 1]` or absolute
//! pixel-scale; the reader distinguishes the two with the "all values ≤ 1"
//! heuristic. The heuristic is inherently ambiguous for a legitimately tiny
//! absolute box (a 1×1-pixel box at the origin reads as normalized); it is
//! kept as-is for compatibility with archives produced by other tools.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Deserialize;

use crate::archive::Archive;
use crate::dataset::{
    base_name, Annotation, AnnotationMap, BBoxXYWH, Category, Dataset, FileContent, FileId,
    ImageFile, Normalized, Pixel,
};
use crate::error::LabelpackError;
use crate::export::ExportJob;

use super::detect::Listing;
use super::{blob_dimensions, file_name, has_image_extension, DatasetFragment, FormatCodec};

pub(crate) struct YoloCodec;

impl FormatCodec for YoloCodec {
    fn matches_listing(&self, listing: &Listing<'_>) -> bool {
        listing.has_rooted("images")
            && listing.has_rooted("labels")
            && (listing.has_top_level("classes.txt") || listing.has_top_level("dataset.yaml"))
    }

    fn parse(&self, archive: &Archive) -> Result<DatasetFragment, LabelpackError> {
        let mut errors = Vec::new();
        let categories = read_categories(archive, &mut errors);

        let mut files = Vec::new();
        let mut annotations = AnnotationMap::new();
        let mut next_annotation_id: u64 = 1;

        let image_paths: Vec<String> = archive
            .paths()
            .filter(|path| path.starts_with("images/") && has_image_extension(path))
            .map(str::to_string)
            .collect();

        for path in image_paths {
            let Some(bytes) = archive.bytes(&path) else {
                continue;
            };
            let (width, height) = match blob_dimensions(bytes) {
                Ok(dimensions) => dimensions,
                Err(reason) => {
                    errors.push(format!("image {}: {}", path, reason));
                    continue;
                }
            };

            let name = file_name(&path).to_string();
            let file_id = FileId::new(files.len() as u64 + 1);

            // A missing label file means an unannotated image, not an error.
            let mut file_annotations = Vec::new();
            let label_path = format!("labels/{}.txt", base_name(&name));
            if let Some(label_text) = archive.text(&label_path) {
                for (line_index, line) in label_text.lines().enumerate() {
                    match parse_label_line(line, width, height) {
                        Ok(Some(row)) => {
                            file_annotations.push(Annotation::new(
                                next_annotation_id,
                                row.class_id,
                                row.bbox,
                            ));
                            next_annotation_id += 1;
                        }
                        Ok(None) => {}
                        Err(reason) => errors.push(format!(
                            "label {}: line {}: {}",
                            label_path,
                            line_index + 1,
                            reason
                        )),
                    }
                }
            }

            files.push(ImageFile::new(
                file_id,
                name,
                FileContent::Bytes(bytes.to_vec()),
                width,
                height,
            ));
            annotations.insert(file_id, file_annotations);
        }

        Ok(DatasetFragment {
            dataset: Dataset {
                files,
                categories,
                annotations,
            },
            errors,
        })
    }

    fn render(&self, job: &ExportJob<'_>) -> Result<Vec<(String, Vec<u8>)>, LabelpackError> {
        let positions = job.category_positions();
        let mut entries = Vec::new();

        entries.push(("classes.txt".to_string(), classes_txt(job.categories).into_bytes()));

        for prepared in &job.files {
            entries.push((
                format!("images/{}", prepared.file.name),
                prepared.bytes.clone(),
            ));

            let mut label = String::new();
            for annotation in &prepared.annotations {
                let class_index = positions
                    .get(&annotation.category_id)
                    .copied()
                    .unwrap_or(0);

                if job.options.normalize_coords {
                    let (cx, cy, w, h) = annotation
                        .bbox
                        .to_normalized(prepared.file.width as f64, prepared.file.height as f64)
                        .to_cxcywh();
                    let _ = writeln!(
                        label,
                        "{} {:.6} {:.6} {:.6} {:.6}",
                        class_index, cx, cy, w, h
                    );
                } else {
                    let (cx, cy, w, h) = annotation.bbox.to_cxcywh();
                    let _ = writeln!(label, "{} {} {} {} {}", class_index, cx, cy, w, h);
                }
            }

            entries.push((
                format!("labels/{}.txt", prepared.file.base_name()),
                label.into_bytes(),
            ));
        }

        entries.push(("dataset.yaml".to_string(), dataset_yaml(job.categories).into_bytes()));

        Ok(entries)
    }
}

#[derive(Debug, PartialEq)]
struct YoloLabelRow {
    class_id: u64,
    bbox: BBoxXYWH<Pixel>,
}

/// Parses one label line into a pixel-space row.
///
/// Blank lines and lines with fewer than five tokens yield `Ok(None)`;
/// tokens past the fifth are ignored. Unparseable numbers are per-line
/// errors that do not abort the file.
fn parse_label_line(
    line: &str,
    image_width: u32,
    image_height: u32,
) -> Result<Option<YoloLabelRow>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 5 {
        return Ok(None);
    }

    let class_id = tokens[0]
        .parse::<u64>()
        .map_err(|_| format!("invalid class id '{}'", tokens[0]))?;
    let cx = parse_f64_token(tokens[1], "x_center")?;
    let cy = parse_f64_token(tokens[2], "y_center")?;
    let w = parse_f64_token(tokens[3], "width")?;
    let h = parse_f64_token(tokens[4], "height")?;

    // Coordinate-mode heuristic: all four values within [0, 1] means
    // normalized; anything larger means absolute pixel center-form.
    let normalized = cx <= 1.0 && cy <= 1.0 && w <= 1.0 && h <= 1.0;
    let pixel = if normalized {
        BBoxXYWH::<Normalized>::from_cxcywh(cx, cy, w, h)
            .to_pixel(image_width as f64, image_height as f64)
    } else {
        BBoxXYWH::<Pixel>::from_cxcywh(cx, cy, w, h)
    };

    // Clamp away degenerate corners and sizes, then snap to whole pixels.
    let bbox = BBoxXYWH::from_xywh(
        pixel.x().max(0.0).round(),
        pixel.y().max(0.0).round(),
        pixel.width.max(1.0).round(),
        pixel.height.max(1.0).round(),
    );

    Ok(Some(YoloLabelRow { class_id, bbox }))
}

fn parse_f64_token(raw: &str, field_name: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("invalid {} '{}'", field_name, raw))
}

fn classes_txt(categories: &[Category]) -> String {
    let mut out = String::new();
    for category in categories {
        out.push_str(&category.name);
        out.push('\n');
    }
    out
}

fn dataset_yaml(categories: &[Category]) -> String {
    let mut yaml = String::from("path: ./dataset\ntrain: images\nval: images\ntest: images\n\n");
    yaml.push_str(&format!("nc: {}\n", categories.len()));
    yaml.push_str("names:\n");
    for (index, category) in categories.iter().enumerate() {
        yaml.push_str(&format!("  {}: {}\n", index, yaml_single_quoted(&category.name)));
    }
    yaml
}

fn yaml_single_quoted(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

fn read_categories(archive: &Archive, errors: &mut Vec<String>) -> Vec<Category> {
    if let Some(path) = find_config(archive, "dataset.yaml") {
        if let Some(text) = archive.text(path) {
            match parse_names_yaml(&text) {
                Ok(names) if !names.is_empty() => return categories_from_names(names),
                Ok(_) => {}
                Err(reason) => errors.push(format!("dataset.yaml: {}", reason)),
            }
        }
    }

    if let Some(path) = find_config(archive, "classes.txt") {
        if let Some(text) = archive.text(path) {
            return parse_classes_txt(&text);
        }
    }

    Vec::new()
}

fn find_config<'a>(archive: &'a Archive, name: &str) -> Option<&'a str> {
    let nested = format!("/{}", name);
    archive
        .find_path(|path| path == name)
        .or_else(|| archive.find_path(|path| path.ends_with(&nested)))
}

#[derive(Debug, Deserialize)]
struct DatasetYaml {
    names: NamesBlock,
}

/// The `names:` block of a YOLO dataset.yaml, in either of its two common
/// spellings: an index-keyed mapping or a plain sequence.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NamesBlock {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

fn parse_names_yaml(text: &str) -> Result<Vec<String>, String> {
    let parsed: DatasetYaml = serde_yaml::from_str(text).map_err(|source| source.to_string())?;

    Ok(match parsed.names {
        NamesBlock::Sequence(names) => names,
        NamesBlock::Mapping(mapping) => {
            let Some(max_index) = mapping.keys().max().copied() else {
                return Ok(Vec::new());
            };
            let mut names = vec![String::new(); max_index + 1];
            for (index, name) in mapping {
                names[index] = name;
            }
            for (index, name) in names.iter_mut().enumerate() {
                if name.trim().is_empty() {
                    *name = format!("class_{}", index);
                }
            }
            names
        }
    })
}

fn categories_from_names(names: Vec<String>) -> Vec<Category> {
    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| Category::at_index(index, name.trim()))
        .collect()
}

fn parse_classes_txt(text: &str) -> Vec<Category> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, name)| Category::at_index(index, name))
        .collect()
}
