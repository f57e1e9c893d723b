//! REDEFINES target resolution.
//!
//! The builder asks a [`FieldLookup`] where an overlaid field starts. The
//! default [`DepthFirstLookup`] walks the fields built so far in the
//! enclosing scope; copybooks are small enough that a linear search is fine,
//! and a name index can be swapped in behind the same trait.

use copybook_schema_core::FieldNode;

/// Resolves the start offset of a previously built field.
pub trait FieldLookup {
    /// Start offset of the field named `source_name` (copybook identifier)
    /// within `scope`, or `None` if no such field exists.
    fn find_start(&self, scope: &[FieldNode], source_name: &str) -> Option<usize>;
}

/// Pre-order depth-first search over a scope.
///
/// Descends into group children and into the first repetition of lists.
/// Names compare case-insensitively against `source_name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthFirstLookup;

impl FieldLookup for DepthFirstLookup {
    fn find_start(&self, scope: &[FieldNode], source_name: &str) -> Option<usize> {
        find_field(scope, source_name).map(|field| field.start)
    }
}

/// Finds the first field in pre-order whose copybook identifier matches.
pub fn find_field<'a>(scope: &'a [FieldNode], source_name: &str) -> Option<&'a FieldNode> {
    scope.iter().find_map(|field| {
        if field.source_name.eq_ignore_ascii_case(source_name) {
            return Some(field);
        }
        field
            .children
            .as_ref()
            .and_then(|children| find_field(children.primary(), source_name))
    })
}

/// Offset form used by the established schema format: the target's start
/// minus one, or `-1` when the target is not found (or starts beyond
/// `i64::MAX`).
///
/// Adding one to the result recovers the true start on success and yields
/// `0` on failure.
///
/// # Examples
///
/// ```
/// use copybook_schema_core::{FieldKind, FieldNode};
/// use copybook_schema_layout::redefines::redefinition_offset;
///
/// let scope = vec![
///     FieldNode::elementary("A", FieldKind::String, 0, 4),
///     FieldNode::elementary("B", FieldKind::String, 4, 6),
/// ];
/// assert_eq!(redefinition_offset(&scope, "B"), 3);
/// assert_eq!(redefinition_offset(&scope, "MISSING"), -1);
/// ```
pub fn redefinition_offset(scope: &[FieldNode], source_name: &str) -> i64 {
    DepthFirstLookup
        .find_start(scope, source_name)
        .and_then(|start| i64::try_from(start).ok())
        .map_or(-1, |start| start - 1)
}

#[cfg(test)]
mod tests {
    use copybook_schema_core::FieldKind;

    use super::*;

    fn scope() -> Vec<FieldNode> {
        let reps = (0..2)
            .map(|i| vec![FieldNode::elementary("LINE-AMT", FieldKind::Number, 10 + i * 5, 5)])
            .collect();
        vec![
            FieldNode::elementary("HDR", FieldKind::String, 0, 4),
            FieldNode::group(
                "BODY",
                vec![
                    FieldNode::elementary("BODY-ID", FieldKind::Number, 4, 6),
                    FieldNode::list("LINES", reps, 10, 10),
                ],
                4,
                16,
            ),
        ]
    }

    #[test]
    fn test_finds_top_level_and_nested_fields() {
        let scope = scope();
        assert_eq!(DepthFirstLookup.find_start(&scope, "HDR"), Some(0));
        assert_eq!(DepthFirstLookup.find_start(&scope, "BODY-ID"), Some(4));
        assert_eq!(DepthFirstLookup.find_start(&scope, "lines"), Some(10));
    }

    #[test]
    fn test_list_search_uses_first_repetition() {
        assert_eq!(DepthFirstLookup.find_start(&scope(), "LINE-AMT"), Some(10));
    }

    #[test]
    fn test_offset_form_at_record_start() {
        assert_eq!(redefinition_offset(&scope(), "HDR"), -1);
        assert_eq!(redefinition_offset(&scope(), "BODY"), 3);
        assert_eq!(redefinition_offset(&[], "HDR"), -1);
    }
}
