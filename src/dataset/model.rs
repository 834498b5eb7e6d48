//! Core dataset model for the labelpack canonical representation.
//!
//! This module defines the format-agnostic representation of an annotation
//! workspace. All format parsers produce this model, and all exporters
//! consume it: formats parse into this representation, and this
//! representation renders out to target formats.

use std::collections::BTreeMap;

use super::bbox::BBoxXYWH;
use super::ids::{AnnotationId, CategoryId, FileId};
use super::palette::color_for_index;
use super::space::Pixel;

/// Annotations grouped by the file that owns them, in insertion order.
pub type AnnotationMap = BTreeMap<FileId, Vec<Annotation>>;

/// The binary content of an image file.
///
/// Parsers produce [`FileContent::Bytes`] straight from the archive; files
/// in the live working set typically carry a [`FileContent::Reference`]
/// handle that the caller's transport resolves to bytes at export time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileContent {
    /// Raw image bytes held in memory.
    Bytes(Vec<u8>),
    /// An opaque handle (URL, object key) resolved by the caller's transport.
    Reference(String),
}

impl FileContent {
    /// Returns true if there is no usable content behind this value.
    pub fn is_empty(&self) -> bool {
        match self {
            FileContent::Bytes(bytes) => bytes.is_empty(),
            FileContent::Reference(reference) => reference.is_empty(),
        }
    }
}

/// An image file in the dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageFile {
    /// Unique identifier for this file within the dataset.
    pub id: FileId,

    /// Filename of the image (no directory component).
    pub name: String,

    /// The image binary, or a reference to it.
    pub content: FileContent,

    /// Width of the image in pixels.
    pub width: u32,

    /// Height of the image in pixels.
    pub height: u32,
}

impl ImageFile {
    /// Creates a new image file record.
    pub fn new(
        id: impl Into<FileId>,
        name: impl Into<String>,
        content: FileContent,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content,
            width,
            height,
        }
    }

    /// The file name with its final extension stripped.
    ///
    /// Label and XML siblings are named after this stem across all three
    /// archive layouts.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }
}

/// Strips the final extension from a file name.
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

/// A category (class label) in the dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    /// Unique identifier for this category.
    pub id: CategoryId,

    /// Name of the category (e.g., "person", "crane", "container").
    pub name: String,

    /// Display color, from the fixed palette.
    pub display_color: String,
}

impl Category {
    /// Creates a new category with an explicit display color.
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        display_color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_color: display_color.into(),
        }
    }

    /// Creates a category at a given list index, with the palette color for
    /// that index.
    pub fn at_index(index: usize, name: impl Into<String>) -> Self {
        Self::new(index as u64, name, color_for_index(index))
    }
}

/// An annotation (bounding box with label) owned by exactly one file.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Unique identifier for this annotation within the dataset.
    pub id: AnnotationId,

    /// ID of the category (class) for this annotation.
    ///
    /// A dangling reference is tolerated and surfaced as a validation
    /// warning, not an error.
    pub category_id: CategoryId,

    /// Bounding box in pixel coordinates (XYWH, top-left origin).
    pub bbox: BBoxXYWH<Pixel>,
}

impl Annotation {
    /// Creates a new annotation.
    pub fn new(
        id: impl Into<AnnotationId>,
        category_id: impl Into<CategoryId>,
        bbox: BBoxXYWH<Pixel>,
    ) -> Self {
        Self {
            id: id.into(),
            category_id: category_id.into(),
            bbox,
        }
    }
}

/// A complete annotation workspace: files, categories, and per-file
/// annotations.
///
/// This is the central data structure all format conversions work through.
/// Parsers build a fresh `Dataset` fragment; exporters read one without
/// mutating it; the merger reconciles two of them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    /// All image files, in insertion order.
    pub files: Vec<ImageFile>,

    /// All category definitions, in insertion order.
    pub categories: Vec<Category>,

    /// Annotations keyed by owning file ID.
    pub annotations: AnnotationMap,
}

impl Dataset {
    /// The annotations owned by a file, or an empty slice if it has none.
    pub fn annotations_for(&self, file_id: FileId) -> &[Annotation] {
        self.annotations
            .get(&file_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of annotations across all files.
    pub fn total_annotations(&self) -> usize {
        self.annotations.values().map(Vec::len).sum()
    }

    /// The largest annotation ID in use, if any annotation exists.
    pub fn max_annotation_id(&self) -> Option<AnnotationId> {
        self.annotations
            .values()
            .flatten()
            .map(|annotation| annotation.id)
            .max()
    }

    /// Looks up a category's position in the category list.
    pub fn category_index(&self, category_id: CategoryId) -> Option<usize> {
        self.categories
            .iter()
            .position(|category| category.id == category_id)
    }
}
