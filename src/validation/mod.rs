//! Validation of imported dataset fragments.
//!
//! Checks the structural completeness an annotation workspace relies on:
//! a non-empty file list, and per-file id/name/content integrity. Dangling
//! category references are deliberately tolerated: they only produce
//! warnings, since imported archives may legitimately reference classes
//! that were never declared.

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashSet;

use crate::dataset::{CategoryId, Dataset};

/// Validates an imported dataset fragment and returns a report of all
/// issues found.
///
/// The fragment is importable when [`ValidationReport::is_ok`] holds, i.e.
/// no error-severity issues were found. Warnings are diagnostics only.
pub fn validate_fragment(dataset: &Dataset) -> ValidationReport {
    let mut report = ValidationReport::new();

    if dataset.files.is_empty() {
        report.add(ValidationIssue::error(
            IssueCode::NoFiles,
            "no valid image files found",
            IssueContext::Dataset,
        ));
    }

    for file in &dataset.files {
        let id = file.id.as_u64();

        if id == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidFileId,
                format!("file '{}' carries the reserved id 0", file.name),
                IssueContext::File { id },
            ));
        }

        if file.name.is_empty() {
            report.add(ValidationIssue::error(
                IssueCode::EmptyFileName,
                "file has an empty name",
                IssueContext::File { id },
            ));
        }

        if file.content.is_empty() {
            report.add(ValidationIssue::error(
                IssueCode::EmptyFileContent,
                format!("file '{}' has no binary content or reference", file.name),
                IssueContext::File { id },
            ));
        }
    }

    let category_ids: HashSet<CategoryId> =
        dataset.categories.iter().map(|c| c.id).collect();

    for annotations in dataset.annotations.values() {
        for annotation in annotations {
            if !category_ids.contains(&annotation.category_id) {
                report.add(ValidationIssue::warning(
                    IssueCode::DanglingCategoryRef,
                    format!(
                        "references undeclared category {}",
                        annotation.category_id
                    ),
                    IssueContext::Annotation {
                        id: annotation.id.as_u64(),
                    },
                ));
            }
        }
    }

    report
}
