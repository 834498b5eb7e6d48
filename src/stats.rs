//! Dataset statistics.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::dataset::Dataset;

/// Aggregate statistics over a dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DatasetStats {
    /// Total number of image files.
    pub total_files: usize,
    /// Total number of annotations across all files.
    pub total_annotations: usize,
    /// Total number of declared categories.
    pub total_categories: usize,
    /// Files carrying at least one annotation.
    pub files_with_annotations: usize,
    /// Files with no annotations.
    pub empty_files: usize,
    /// Annotation counts per category name. Annotations whose category is
    /// undeclared are not counted here.
    pub category_counts: BTreeMap<String, usize>,
    /// Mean annotations per file.
    pub average_annotations_per_file: f64,
}

/// Computes statistics for a dataset.
pub fn dataset_stats(dataset: &Dataset) -> DatasetStats {
    let mut stats = DatasetStats {
        total_files: dataset.files.len(),
        total_categories: dataset.categories.len(),
        ..Default::default()
    };

    for category in &dataset.categories {
        stats.category_counts.entry(category.name.clone()).or_insert(0);
    }

    for file in &dataset.files {
        let annotations = dataset.annotations_for(file.id);
        if annotations.is_empty() {
            stats.empty_files += 1;
            continue;
        }

        stats.files_with_annotations += 1;
        stats.total_annotations += annotations.len();

        for annotation in annotations {
            if let Some(index) = dataset.category_index(annotation.category_id) {
                let name = &dataset.categories[index].name;
                if let Some(count) = stats.category_counts.get_mut(name) {
                    *count += 1;
                }
            }
        }
    }

    if stats.total_files > 0 {
        stats.average_annotations_per_file =
            stats.total_annotations as f64 / stats.total_files as f64;
    }

    stats
}

impl fmt::Display for DatasetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} file(s), {} annotation(s), {} category(s)",
            self.total_files, self.total_annotations, self.total_categories
        )?;
        writeln!(
            f,
            "{} annotated, {} empty, {:.2} annotation(s) per file",
            self.files_with_annotations, self.empty_files, self.average_annotations_per_file
        )?;
        for (name, count) in &self.category_counts {
            writeln!(f, "  {}: {}", name, count)?;
        }
        Ok(())
    }
}
