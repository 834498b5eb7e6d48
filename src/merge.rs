//! Merge-on-import: reconciling an imported fragment with a working
//! dataset.
//!
//! The merger never invents colliding ids: appended categories, files, and
//! annotations continue each id sequence from the existing dataset's
//! maximum. Categories reconcile by name; files deduplicate by name, with
//! a skipped duplicate dropping its annotations.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::dataset::{AnnotationId, Category, CategoryId, Dataset, FileId};
use crate::error::LabelpackError;

/// How an imported dataset is combined with the existing working dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Discard the existing dataset; the result is the import verbatim.
    Replace,
    /// Append new categories/files/annotations, reconciling categories by
    /// name and skipping files whose names already exist.
    Append,
    /// Currently behaves identically to [`MergeStrategy::Append`]. A true
    /// content-aware merge of same-named files' annotations is an open
    /// product question; until it is answered this stays a shallow alias.
    Merge,
}

impl FromStr for MergeStrategy {
    type Err = LabelpackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "replace" => Ok(MergeStrategy::Replace),
            "append" => Ok(MergeStrategy::Append),
            "merge" => Ok(MergeStrategy::Merge),
            other => Err(LabelpackError::UnknownMergeStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeStrategy::Replace => f.write_str("replace"),
            MergeStrategy::Append => f.write_str("append"),
            MergeStrategy::Merge => f.write_str("merge"),
        }
    }
}

/// Counts describing what a merge did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Files appended from the import.
    pub new_files: usize,
    /// Annotations appended from the import.
    pub new_annotations: usize,
    /// Categories appended because no existing category had their name.
    pub new_categories: usize,
    /// Imported files skipped because a file of the same name existed.
    pub duplicate_files: usize,
    /// Imported categories remapped onto an existing same-named category.
    pub merged_categories: usize,
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} new file(s), {} new annotation(s), {} new category(s), \
             {} duplicate file(s) skipped, {} category(s) merged",
            self.new_files,
            self.new_annotations,
            self.new_categories,
            self.duplicate_files,
            self.merged_categories
        )
    }
}

/// A merged dataset together with the merge report.
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    pub dataset: Dataset,
    pub report: MergeReport,
}

/// Merges an imported dataset into an existing one under the given
/// strategy.
///
/// Neither input is mutated; the merged dataset is a fresh value.
pub fn merge_datasets(
    existing: &Dataset,
    incoming: &Dataset,
    strategy: MergeStrategy,
) -> MergeOutcome {
    match strategy {
        MergeStrategy::Replace => MergeOutcome {
            dataset: incoming.clone(),
            report: MergeReport {
                new_files: incoming.files.len(),
                new_annotations: incoming.total_annotations(),
                new_categories: incoming.categories.len(),
                duplicate_files: 0,
                merged_categories: 0,
            },
        },
        // `merge` is a deliberate alias of `append` for now.
        MergeStrategy::Append | MergeStrategy::Merge => append(existing, incoming),
    }
}

fn append(existing: &Dataset, incoming: &Dataset) -> MergeOutcome {
    let mut dataset = existing.clone();
    let mut report = MergeReport::default();

    // Reconcile categories by name, continuing the id sequence from the
    // existing maximum.
    let mut id_by_name: BTreeMap<String, CategoryId> = dataset
        .categories
        .iter()
        .map(|category| (category.name.clone(), category.id))
        .collect();
    let mut next_category_id = dataset
        .categories
        .iter()
        .map(|category| category.id.as_u64())
        .max()
        .map(|max| max + 1)
        .unwrap_or(0);

    let mut category_remap: BTreeMap<CategoryId, CategoryId> = BTreeMap::new();

    for imported in &incoming.categories {
        if let Some(existing_id) = id_by_name.get(&imported.name) {
            category_remap.insert(imported.id, *existing_id);
            report.merged_categories += 1;
        } else {
            let new_id = CategoryId::new(next_category_id);
            next_category_id += 1;

            dataset.categories.push(Category::new(
                new_id,
                imported.name.clone(),
                imported.display_color.clone(),
            ));
            id_by_name.insert(imported.name.clone(), new_id);
            category_remap.insert(imported.id, new_id);
            report.new_categories += 1;
        }
    }

    // Files deduplicate by exact name; a skipped duplicate drops its
    // annotations with it.
    let existing_names: HashSet<&str> =
        existing.files.iter().map(|file| file.name.as_str()).collect();
    let mut next_file_id = dataset
        .files
        .iter()
        .map(|file| file.id.as_u64())
        .max()
        .map(|max| max + 1)
        .unwrap_or(1);
    let mut next_annotation_id = dataset
        .max_annotation_id()
        .map(|id| id.as_u64() + 1)
        .unwrap_or(1);

    for imported in &incoming.files {
        if existing_names.contains(imported.name.as_str()) {
            report.duplicate_files += 1;
            log::warn!("skipping duplicate file '{}'", imported.name);
            continue;
        }

        let new_file_id = FileId::new(next_file_id);
        next_file_id += 1;

        let mut file = imported.clone();
        file.id = new_file_id;
        dataset.files.push(file);
        report.new_files += 1;

        let remapped: Vec<_> = incoming
            .annotations_for(imported.id)
            .iter()
            .map(|annotation| {
                let mut annotation = annotation.clone();
                annotation.id = AnnotationId::new(next_annotation_id);
                next_annotation_id += 1;
                annotation.category_id = category_remap
                    .get(&annotation.category_id)
                    .copied()
                    .unwrap_or(annotation.category_id);
                annotation
            })
            .collect();

        report.new_annotations += remapped.len();
        dataset.annotations.insert(new_file_id, remapped);
    }

    MergeOutcome { dataset, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Annotation, AnnotationMap, BBoxXYWH, FileContent, ImageFile};

    fn dataset_with(
        files: Vec<(u64, &str)>,
        categories: Vec<(u64, &str)>,
        annotations: Vec<(u64, u64, u64)>, // (file, annotation id, category)
    ) -> Dataset {
        let mut map = AnnotationMap::new();
        for (file_id, annotation_id, category_id) in annotations {
            map.entry(FileId(file_id)).or_default().push(Annotation::new(
                annotation_id,
                category_id,
                BBoxXYWH::from_xywh(0.0, 0.0, 10.0, 10.0),
            ));
        }

        Dataset {
            files: files
                .into_iter()
                .map(|(id, name)| {
                    ImageFile::new(id, name, FileContent::Bytes(vec![1, 2]), 100, 100)
                })
                .collect(),
            categories: categories
                .into_iter()
                .map(|(id, name)| Category::new(id, name, "#000000"))
                .collect(),
            annotations: map,
        }
    }

    #[test]
    fn replace_returns_the_import_verbatim() {
        let existing = dataset_with(vec![(1, "old.jpg")], vec![(0, "crane")], vec![(1, 1, 0)]);
        let incoming = dataset_with(vec![(1, "new.jpg")], vec![(0, "ship")], vec![(1, 1, 0)]);

        let outcome = merge_datasets(&existing, &incoming, MergeStrategy::Replace);
        assert_eq!(outcome.dataset, incoming);
        assert_eq!(outcome.report.new_files, 1);
        assert_eq!(outcome.report.new_annotations, 1);
        assert_eq!(outcome.report.new_categories, 1);
    }

    #[test]
    fn append_reconciles_same_named_categories() {
        let existing = dataset_with(vec![(1, "a.jpg")], vec![(0, "car")], vec![(1, 1, 0)]);
        let incoming = dataset_with(vec![(1, "b.jpg")], vec![(0, "car")], vec![(1, 1, 0)]);

        let outcome = merge_datasets(&existing, &incoming, MergeStrategy::Append);
        assert_eq!(outcome.report.merged_categories, 1);
        assert_eq!(outcome.report.new_categories, 0);
        assert_eq!(outcome.dataset.categories.len(), 1);

        // The appended file's annotations now reference the existing "car".
        let appended = outcome
            .dataset
            .files
            .iter()
            .find(|file| file.name == "b.jpg")
            .expect("appended file");
        let annotations = outcome.dataset.annotations_for(appended.id);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].category_id, CategoryId(0));
    }

    #[test]
    fn append_allocates_ids_past_existing_maxima() {
        let existing = dataset_with(
            vec![(1, "a.jpg"), (5, "b.jpg")],
            vec![(0, "car"), (3, "bus")],
            vec![(1, 7, 0)],
        );
        let incoming = dataset_with(vec![(1, "c.jpg")], vec![(0, "bike")], vec![(1, 1, 0)]);

        let outcome = merge_datasets(&existing, &incoming, MergeStrategy::Append);

        let appended = outcome
            .dataset
            .files
            .iter()
            .find(|file| file.name == "c.jpg")
            .expect("appended file");
        assert_eq!(appended.id, FileId(6));

        let bike = outcome
            .dataset
            .categories
            .iter()
            .find(|category| category.name == "bike")
            .expect("appended category");
        assert_eq!(bike.id, CategoryId(4));

        let annotations = outcome.dataset.annotations_for(appended.id);
        assert_eq!(annotations[0].id, AnnotationId(8));
        assert_eq!(annotations[0].category_id, CategoryId(4));
    }

    #[test]
    fn append_skips_duplicate_file_names() {
        let existing = dataset_with(vec![(1, "img001.jpg")], vec![(0, "car")], vec![(1, 1, 0)]);
        let incoming = dataset_with(
            vec![(1, "img001.jpg"), (2, "img002.jpg")],
            vec![(0, "car")],
            vec![(1, 1, 0), (2, 2, 0)],
        );

        let outcome = merge_datasets(&existing, &incoming, MergeStrategy::Append);
        assert_eq!(outcome.report.duplicate_files, 1);
        assert_eq!(outcome.report.new_files, 1);
        // The duplicate's annotations are dropped with it.
        assert_eq!(outcome.report.new_annotations, 1);
        assert_eq!(outcome.dataset.files.len(), 2);
    }

    #[test]
    fn append_into_empty_dataset_starts_id_sequences_fresh() {
        let existing = Dataset::default();
        let incoming = dataset_with(vec![(3, "a.jpg")], vec![(7, "car")], vec![(3, 9, 7)]);

        let outcome = merge_datasets(&existing, &incoming, MergeStrategy::Append);
        assert_eq!(outcome.dataset.files[0].id, FileId(1));
        assert_eq!(outcome.dataset.categories[0].id, CategoryId(0));
        let annotations = outcome.dataset.annotations_for(FileId(1));
        assert_eq!(annotations[0].id, AnnotationId(1));
        assert_eq!(annotations[0].category_id, CategoryId(0));
    }

    #[test]
    fn merge_strategy_is_an_alias_of_append() {
        let existing = dataset_with(vec![(1, "a.jpg")], vec![(0, "car")], vec![(1, 1, 0)]);
        let incoming = dataset_with(vec![(1, "b.jpg")], vec![(0, "car")], vec![(1, 1, 0)]);

        let appended = merge_datasets(&existing, &incoming, MergeStrategy::Append);
        let merged = merge_datasets(&existing, &incoming, MergeStrategy::Merge);
        assert_eq!(appended.dataset, merged.dataset);
        assert_eq!(appended.report, merged.report);
    }

    #[test]
    fn unknown_strategy_token_is_fatal() {
        let err = "overwrite".parse::<MergeStrategy>().unwrap_err();
        assert!(matches!(err, LabelpackError::UnknownMergeStrategy(_)));
    }
}
