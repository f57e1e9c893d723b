//! Record schema and package validation.
//!
//! Checks the structural invariants of a schema tree: contiguous sibling
//! ranges, group and list lengths that match their contents, list
//! repetition counts, and children present exactly on structural kinds.
//! Builder output for well-formed copybooks always passes; hand-edited or
//! externally produced schemas are where these checks earn their keep.
//!
//! # Examples
//!
//! ```
//! use copybook_schema_core::*;
//!
//! let mut record = RecordSchema {
//!     data: vec![
//!         FieldNode::elementary("A", FieldKind::String, 0, 5),
//!         FieldNode::elementary("B", FieldKind::Number, 5, 3),
//!     ],
//!     start: 0,
//!     length: 8,
//! };
//! assert!(validate_record(&record).is_empty());
//!
//! // A one-byte gap between siblings
//! record.data[1].start = 6;
//! assert!(!validate_record(&record).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Children, FieldKind, FieldNode, LayoutPackage, RecordSchema};

/// Schema/package validation errors.
///
/// Paths are dotted normalized names from the record root, with `[i]`
/// marking a list repetition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Package version string is empty.
    #[error("package version cannot be empty")]
    EmptyPackageVersion,
    /// Two layouts in the same package share a copybook name.
    #[error("duplicate copybook in package: {0}")]
    DuplicateCopybook(String),
    /// A field has an empty normalized name.
    #[error("field name cannot be empty at: {0}")]
    EmptyFieldName(String),
    /// A sibling does not start where the previous one ended.
    #[error("non-contiguous field {path}: expected start {expected}, found {actual}")]
    NonContiguous {
        path: String,
        expected: usize,
        actual: usize,
    },
    /// A group's length differs from the bytes its children occupy.
    #[error("group length mismatch at {path}: expected {expected}, found {actual}")]
    GroupLength {
        path: String,
        expected: usize,
        actual: usize,
    },
    /// A list's length differs from `occurs` times one repetition.
    #[error("list length mismatch at {path}: expected {expected}, found {actual}")]
    ListLength {
        path: String,
        expected: usize,
        actual: usize,
    },
    /// A list's `occurs` differs from its number of repetitions.
    #[error("occurs mismatch at {path}: occurs {occurs}, repetitions {repetitions}")]
    OccursMismatch {
        path: String,
        occurs: usize,
        repetitions: usize,
    },
    /// A group or list has no children, or an elementary field has some.
    #[error("children do not match field type {kind} at: {path}")]
    ChildrenMismatch { path: String, kind: FieldKind },
}

/// Validates a layout package.
///
/// Checks for an empty version string and duplicate copybook names, then
/// validates each record.
///
/// # Examples
///
/// ```
/// use copybook_schema_core::*;
///
/// let mut package = LayoutPackage::new("1.0.0", "2026-01-01T00:00:00Z");
/// package.layouts.push(NamedLayout::new("cust", RecordSchema::default()));
/// assert!(validate_package(&package).is_empty());
///
/// package.layouts.push(NamedLayout::new("cust", RecordSchema::default()));
/// let errors = validate_package(&package);
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateCopybook(_))));
/// ```
pub fn validate_package(package: &LayoutPackage) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if package.version.trim().is_empty() {
        errors.push(ValidationError::EmptyPackageVersion);
        return errors;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for layout in &package.layouts {
        if !seen.insert(layout.copybook.as_str()) {
            errors.push(ValidationError::DuplicateCopybook(layout.copybook.clone()));
            return errors;
        }
        errors.extend(validate_record(&layout.record));
    }

    errors
}

/// Validates one record schema, reporting every violation found.
pub fn validate_record(record: &RecordSchema) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut path = Vec::new();
    validate_siblings(&record.data, record.start, &mut path, &mut errors);
    errors
}

/// Validates a sibling sequence starting at `start`; returns the end offset
/// of its non-redefining members.
fn validate_siblings(
    fields: &[FieldNode],
    start: usize,
    path: &mut Vec<String>,
    errors: &mut Vec<ValidationError>,
) -> usize {
    let mut cursor = start;
    let mut first = true;

    for field in fields {
        path.push(field.name.clone());

        if field.name.is_empty() {
            errors.push(ValidationError::EmptyFieldName(path.join(".")));
        }

        if !field.is_redefinition() {
            // The first sibling anchors the sequence when the caller does not
            // know its start (e.g. a record deserialized without envelope).
            if first {
                cursor = field.start;
            }
            if field.start != cursor {
                errors.push(ValidationError::NonContiguous {
                    path: path.join("."),
                    expected: cursor,
                    actual: field.start,
                });
            }
            cursor = field.end();
            first = false;
        }

        validate_children(field, path, errors);
        path.pop();
    }

    cursor
}

fn validate_children(field: &FieldNode, path: &mut Vec<String>, errors: &mut Vec<ValidationError>) {
    match (&field.children, field.kind) {
        (None, kind) if !kind.is_structural() => {}
        (Some(Children::Fields(fields)), FieldKind::Group) => {
            let end = validate_siblings(fields, field.start, path, errors);
            let occupied = end.saturating_sub(field.start);
            if !fields.is_empty() && occupied != field.length {
                errors.push(ValidationError::GroupLength {
                    path: path.join("."),
                    expected: occupied,
                    actual: field.length,
                });
            }
        }
        (Some(Children::Repetitions(reps)), FieldKind::List) => {
            let occurs = field.occurs.unwrap_or(reps.len());
            if occurs != reps.len() {
                errors.push(ValidationError::OccursMismatch {
                    path: path.join("."),
                    occurs,
                    repetitions: reps.len(),
                });
            }

            let mut rep_start = field.start;
            let mut rep_length = 0;
            for (i, rep) in reps.iter().enumerate() {
                path.push(format!("[{i}]"));
                let end = validate_siblings(rep, rep_start, path, errors);
                path.pop();
                if i == 0 {
                    rep_length = end.saturating_sub(rep_start);
                }
                rep_start = end;
            }

            let expected = occurs.saturating_mul(rep_length);
            if expected != field.length {
                errors.push(ValidationError::ListLength {
                    path: path.join("."),
                    expected,
                    actual: field.length,
                });
            }
        }
        // An empty `data` array deserializes as `Fields`; accept it on lists.
        (Some(Children::Fields(fields)), FieldKind::List) if fields.is_empty() => {}
        (_, kind) => errors.push(ValidationError::ChildrenMismatch {
            path: path.join("."),
            kind,
        }),
    }
}
