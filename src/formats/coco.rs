//! COCO JSON archive codec.
//!
//! Layout: `images/` tree plus one `annotations.json` manifest with the
//! standard top-level `info` / `licenses` / `images` / `annotations` /
//! `categories` keys. Boxes are `[x, y, width, height]` in absolute pixel
//! units with a top-left origin.
//!
//! Exported category ids are 1-based and contiguous (list position + 1);
//! the reader re-indexes declared categories 0-based and treats the COCO
//! ids purely as lookup keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::archive::Archive;
use crate::dataset::{
    Annotation, AnnotationMap, BBoxXYWH, Category, Dataset, FileContent, FileId, ImageFile,
};
use crate::error::LabelpackError;
use crate::export::ExportJob;

use super::detect::Listing;
use super::{DatasetFragment, FormatCodec};

pub(crate) struct CocoCodec;

impl FormatCodec for CocoCodec {
    fn matches_listing(&self, listing: &Listing<'_>) -> bool {
        listing.has_rooted("images") && listing.has_top_level("annotations.json")
    }

    fn parse(&self, archive: &Archive) -> Result<DatasetFragment, LabelpackError> {
        let manifest_path = find_manifest(archive).ok_or(LabelpackError::CocoManifestMissing)?;
        let manifest_bytes = archive
            .bytes(&manifest_path)
            .ok_or(LabelpackError::CocoManifestMissing)?;

        let manifest: CocoManifest = serde_json::from_slice(manifest_bytes).map_err(|source| {
            LabelpackError::CocoJsonParse {
                path: manifest_path.clone(),
                source,
            }
        })?;

        let mut errors = Vec::new();

        // Re-index categories 0-based; COCO's own ids are only lookup keys.
        let categories: Vec<Category> = manifest
            .categories
            .iter()
            .enumerate()
            .map(|(index, category)| Category::at_index(index, category.name.clone()))
            .collect();
        let category_by_coco_id: BTreeMap<u64, u64> = manifest
            .categories
            .iter()
            .enumerate()
            .map(|(index, category)| (category.id, index as u64))
            .collect();

        let mut files = Vec::new();
        let mut annotations = AnnotationMap::new();
        let mut file_by_coco_id: BTreeMap<u64, FileId> = BTreeMap::new();

        for image in &manifest.images {
            let image_path = format!("images/{}", image.file_name);
            let Some(bytes) = archive.bytes(&image_path) else {
                errors.push(format!("image file not found: {}", image_path));
                continue;
            };

            let file_id = FileId::new(files.len() as u64 + 1);
            files.push(ImageFile::new(
                file_id,
                image.file_name.clone(),
                FileContent::Bytes(bytes.to_vec()),
                image.width,
                image.height,
            ));
            annotations.insert(file_id, Vec::new());
            file_by_coco_id.insert(image.id, file_id);
        }

        let mut next_annotation_id: u64 = 1;
        for entry in &manifest.annotations {
            // The missing-image case was already reported when the image
            // entry was skipped.
            let Some(file_id) = file_by_coco_id.get(&entry.image_id) else {
                continue;
            };
            let Some(category_id) = category_by_coco_id.get(&entry.category_id) else {
                errors.push(format!(
                    "annotation {} references unknown category id {}",
                    entry.id, entry.category_id
                ));
                continue;
            };

            let [x, y, width, height] = entry.bbox;
            let bbox = BBoxXYWH::from_xywh(x.round(), y.round(), width.round(), height.round());

            annotations
                .entry(*file_id)
                .or_default()
                .push(Annotation::new(next_annotation_id, *category_id, bbox));
            next_annotation_id += 1;
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

        let mut manifest = CocoManifest {
            info: Some(CocoInfo {
                description: Some("Dataset exported by labelpack".to_string()),
                version: Some("1.0".to_string()),
                contributor: Some("labelpack".to_string()),
            }),
            licenses: vec![CocoLicense {
                id: 1,
                name: "Custom License".to_string(),
                url: Some(String::new()),
            }],
            images: Vec::with_capacity(job.files.len()),
            annotations: Vec::new(),
            categories: job
                .categories
                .iter()
                .enumerate()
                .map(|(index, category)| CocoCategory {
                    id: index as u64 + 1,
                    name: category.name.clone(),
                    supercategory: Some("none".to_string()),
                })
                .collect(),
        };

        let mut next_annotation_id: u64 = 1;
        for prepared in &job.files {
            entries.push((
                format!("images/{}", prepared.file.name),
                prepared.bytes.clone(),
            ));

            manifest.images.push(CocoImage {
                id: prepared.file.id.as_u64(),
                width: prepared.file.width,
                height: prepared.file.height,
                file_name: prepared.file.name.clone(),
                license: Some(1),
            });

            for annotation in &prepared.annotations {
                let category_id = positions
                    .get(&annotation.category_id)
                    .map(|index| *index as u64 + 1)
                    .unwrap_or(0);

                manifest.annotations.push(CocoAnnotation {
                    id: next_annotation_id,
                    image_id: prepared.file.id.as_u64(),
                    category_id,
                    bbox: [
                        annotation.bbox.x(),
                        annotation.bbox.y(),
                        annotation.bbox.width,
                        annotation.bbox.height,
                    ],
                    area: Some(annotation.bbox.area()),
                    iscrowd: Some(0),
                    // Shape is not tracked by this layer.
                    segmentation: serde_json::Value::Array(Vec::new()),
                });
                next_annotation_id += 1;
            }
        }

        let json = serde_json::to_vec_pretty(&manifest).map_err(|source| {
            LabelpackError::CocoJsonParse {
                path: "annotations.json".to_string(),
                source,
            }
        })?;
        entries.push(("annotations.json".to_string(), json));

        Ok(entries)
    }
}

fn find_manifest(archive: &Archive) -> Option<String> {
    archive
        .find_path(|path| path == "annotations.json")
        .or_else(|| archive.find_path(|path| path.ends_with("/annotations.json")))
        .map(str::to_string)
}

// ============================================================================
// COCO schema types (internal to this module)
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct CocoManifest {
    #[serde(default)]
    info: Option<CocoInfo>,

    #[serde(default)]
    licenses: Vec<CocoLicense>,

    images: Vec<CocoImage>,

    annotations: Vec<CocoAnnotation>,

    categories: Vec<CocoCategory>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CocoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    contributor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoLicense {
    id: u64,
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    width: u32,
    height: u32,
    file_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    supercategory: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    /// COCO bbox format: [x, y, width, height] with (x, y) top-left.
    bbox: [f64; 4],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    iscrowd: Option<u8>,

    /// Segmentation data (polygons or RLE). Accepted but ignored; this
    /// layer tracks detection boxes only.
    #[serde(default)]
    segmentation: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_accepts_minimal_schema() {
        let json = r#"{
            "images": [{"id": 7, "width": 100, "height": 80, "file_name": "a.jpg"}],
            "annotations": [
                {"id": 1, "image_id": 7, "category_id": 3, "bbox": [1.0, 2.0, 10.0, 20.0]}
            ],
            "categories": [{"id": 3, "name": "crane"}]
        }"#;

        let manifest: CocoManifest = serde_json::from_str(json).expect("parse manifest");
        assert!(manifest.info.is_none());
        assert_eq!(manifest.images[0].id, 7);
        assert_eq!(manifest.annotations[0].bbox, [1.0, 2.0, 10.0, 20.0]);
        assert_eq!(manifest.categories[0].name, "crane");
    }

    #[test]
    fn manifest_roundtrips_through_serde() {
        let manifest = CocoManifest {
            info: Some(CocoInfo::default()),
            licenses: vec![],
            images: vec![CocoImage {
                id: 1,
                width: 10,
                height: 10,
                file_name: "x.png".to_string(),
                license: None,
            }],
            annotations: vec![],
            categories: vec![],
        };

        let json = serde_json::to_string(&manifest).expect("serialize");
        let back: CocoManifest = serde_json::from_str(&json).expect("reparse");
        assert_eq!(back.images[0].file_name, "x.png");
    }
}
