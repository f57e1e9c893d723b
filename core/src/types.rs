//! Schema type definitions for copybook record layouts.
//!
//! This module defines the data model produced by the layout builder and
//! consumed by record decoders. The types serialize with [`serde`] using the
//! key names and key order of the established JSON schema format
//! (`name`, `copybook_name`, `type`, `redefines`, `occurs`, `data`, `start`,
//! `length`), so existing consumers can read the output unchanged.

use serde::{Deserialize, Serialize};

/// Version of the schema contract (semver).
///
/// Embedded in every [`LayoutPackage`](crate::LayoutPackage) to track
/// compatibility across schema versions.
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

/// Semantic kind of a field.
///
/// Elementary items are `String`, `Number` or `Binary`; structural items are
/// `Group` (a nested sub-structure) or `List` (an OCCURS array of a
/// sub-structure).
///
/// # Examples
///
/// ```
/// use copybook_schema_core::FieldKind;
///
/// assert!(FieldKind::Group.is_structural());
/// assert!(!FieldKind::Number.is_structural());
/// assert_eq!(serde_json::to_string(&FieldKind::Binary).unwrap(), "\"binary\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Alphanumeric display item (e.g. `PIC X(10)`).
    String,
    /// Zoned numeric display item (e.g. `PIC 9(5)V99`).
    Number,
    /// Packed-binary or packed-decimal item (`COMP`, `COMP-3`).
    Binary,
    /// Nested group of fields.
    Group,
    /// Repeated group (`OCCURS`).
    List,
}

impl FieldKind {
    /// Returns `true` for kinds that carry children.
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Group | Self::List)
    }

    /// Label used in serialized output.
    pub fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Binary => "binary",
            Self::Group => "group",
            Self::List => "list",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Children of a structural field.
///
/// A group holds one ordered sequence of fields. A list holds one
/// independently materialized sequence per repetition, each carrying its own
/// absolute offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Children {
    /// Fields of a group.
    Fields(Vec<FieldNode>),
    /// One field sequence per OCCURS repetition.
    Repetitions(Vec<Vec<FieldNode>>),
}

impl Children {
    /// Fields searched when resolving names below this node: the group's
    /// fields, or the first repetition of a list.
    pub fn primary(&self) -> &[FieldNode] {
        match self {
            Self::Fields(fields) => fields,
            Self::Repetitions(reps) => reps.first().map(Vec::as_slice).unwrap_or(&[]),
        }
    }
}

/// One node of the schema tree.
///
/// # Examples
///
/// ```
/// use copybook_schema_core::{FieldKind, FieldNode};
///
/// let field = FieldNode::elementary("CUST-NAME", FieldKind::String, 0, 30);
/// assert_eq!(field.name, "cust_name");
/// assert_eq!(field.source_name, "CUST-NAME");
/// assert_eq!(field.end(), 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNode {
    /// Normalized lower snake case name.
    pub name: String,
    /// Identifier as written in the copybook.
    #[serde(rename = "copybook_name")]
    pub source_name: String,
    /// Semantic kind.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Normalized name of the overlaid field, for REDEFINES items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redefines: Option<String>,
    /// Repetition count, for lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurs: Option<usize>,
    /// Children of groups and lists.
    #[serde(rename = "data", default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Children>,
    /// 0-based byte offset within the record.
    pub start: usize,
    /// Byte length (cumulative for groups and lists).
    pub length: usize,
}

impl FieldNode {
    /// Creates an elementary (non-structural) field.
    pub fn elementary(source_name: &str, kind: FieldKind, start: usize, length: usize) -> Self {
        Self {
            name: snake_case(source_name),
            source_name: source_name.to_string(),
            kind,
            redefines: None,
            occurs: None,
            children: None,
            start,
            length,
        }
    }

    /// Creates a group spanning `start..start + length`.
    pub fn group(source_name: &str, fields: Vec<FieldNode>, start: usize, length: usize) -> Self {
        Self {
            name: snake_case(source_name),
            source_name: source_name.to_string(),
            kind: FieldKind::Group,
            redefines: None,
            occurs: None,
            children: Some(Children::Fields(fields)),
            start,
            length,
        }
    }

    /// Creates a list holding one field sequence per repetition.
    ///
    /// # Examples
    ///
    /// ```
    /// use copybook_schema_core::{FieldKind, FieldNode};
    ///
    /// let reps = (0..3)
    ///     .map(|i| vec![FieldNode::elementary("ITEM", FieldKind::String, i * 5, 5)])
    ///     .collect::<Vec<_>>();
    /// let list = FieldNode::list("ITEMS", reps, 0, 15);
    /// assert_eq!(list.occurs, Some(3));
    /// assert_eq!(list.repetitions().len(), 3);
    /// ```
    pub fn list(
        source_name: &str,
        repetitions: Vec<Vec<FieldNode>>,
        start: usize,
        length: usize,
    ) -> Self {
        Self {
            name: snake_case(source_name),
            source_name: source_name.to_string(),
            kind: FieldKind::List,
            redefines: None,
            occurs: Some(repetitions.len()),
            children: Some(Children::Repetitions(repetitions)),
            start,
            length,
        }
    }

    /// Marks this node as overlaying `target` (a copybook identifier).
    pub fn with_redefines(mut self, target: &str) -> Self {
        self.redefines = Some(snake_case(target));
        self
    }

    /// Exclusive end offset, saturating at `usize::MAX`.
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.length)
    }

    /// Returns `true` if this node overlays another.
    pub fn is_redefinition(&self) -> bool {
        self.redefines.is_some()
    }

    /// Fields of a group; empty for anything else.
    pub fn fields(&self) -> &[FieldNode] {
        match &self.children {
            Some(Children::Fields(fields)) => fields,
            _ => &[],
        }
    }

    /// Repetitions of a list; empty for anything else.
    pub fn repetitions(&self) -> &[Vec<FieldNode>] {
        match &self.children {
            Some(Children::Repetitions(reps)) => reps,
            _ => &[],
        }
    }

    /// Counts this node and every node below it (all repetitions included).
    pub fn node_count(&self) -> usize {
        1 + match &self.children {
            Some(Children::Fields(fields)) => fields.iter().map(FieldNode::node_count).sum(),
            Some(Children::Repetitions(reps)) => reps
                .iter()
                .flatten()
                .map(FieldNode::node_count)
                .sum(),
            None => 0,
        }
    }
}

/// Schema for one copybook record.
///
/// `data` is the top-level field sequence; `start` and `length` describe the
/// byte range the record occupies.
///
/// # Examples
///
/// ```
/// use copybook_schema_core::{FieldKind, FieldNode, RecordSchema};
///
/// let record = RecordSchema {
///     data: vec![
///         FieldNode::elementary("FIELD-A", FieldKind::String, 0, 5),
///         FieldNode::elementary("FIELD-B", FieldKind::Number, 5, 3),
///     ],
///     start: 0,
///     length: 8,
/// };
/// assert!(record.find("FIELD-B").is_some());
/// assert_eq!(record.field_count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Top-level fields.
    pub data: Vec<FieldNode>,
    /// Record start offset.
    pub start: usize,
    /// Record byte length.
    pub length: usize,
}

impl RecordSchema {
    /// Returns `true` when no field was produced.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total number of nodes in the tree.
    pub fn field_count(&self) -> usize {
        self.data.iter().map(FieldNode::node_count).sum()
    }

    /// Finds a field by copybook identifier (case-insensitive), searching
    /// depth-first and into the first repetition of lists.
    pub fn find(&self, source_name: &str) -> Option<&FieldNode> {
        find_in(&self.data, source_name)
    }
}

fn find_in<'a>(fields: &'a [FieldNode], source_name: &str) -> Option<&'a FieldNode> {
    for field in fields {
        if field.source_name.eq_ignore_ascii_case(source_name) {
            return Some(field);
        }
        if let Some(children) = &field.children {
            if let Some(found) = find_in(children.primary(), source_name) {
                return Some(found);
            }
        }
    }
    None
}

/// Normalizes a copybook identifier to lower snake case.
///
/// Words are split on any non-alphanumeric character, on lower-to-upper case
/// transitions, and between letters and digits.
///
/// # Examples
///
/// ```
/// use copybook_schema_core::snake_case;
///
/// assert_eq!(snake_case("FIELD-A"), "field_a");
/// assert_eq!(snake_case("WS-ADDR-LINE1"), "ws_addr_line_1");
/// assert_eq!(snake_case("CustomerId"), "customer_id");
/// ```
pub fn snake_case(identifier: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for ch in identifier.chars() {
        if !ch.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev = None;
            continue;
        }
        let boundary = prev.is_some_and(|p| {
            (p.is_ascii_lowercase() && ch.is_ascii_uppercase())
                || (p.is_ascii_digit() != ch.is_ascii_digit())
        });
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(ch.to_ascii_lowercase());
        prev = Some(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_copybook_identifiers() {
        assert_eq!(snake_case("FIELD-A"), "field_a");
        assert_eq!(snake_case("REC"), "rec");
        assert_eq!(snake_case("WS-TOTAL-AMT2"), "ws_total_amt_2");
        assert_eq!(snake_case("--"), "");
    }

    #[test]
    fn test_elementary_serializes_keys_in_order() {
        let field = FieldNode::elementary("FIELD-A", FieldKind::String, 0, 5);
        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(
            json,
            r#"{"name":"field_a","copybook_name":"FIELD-A","type":"string","start":0,"length":5}"#
        );
    }

    #[test]
    fn test_list_serializes_nested_repetition_arrays() {
        let reps = vec![
            vec![FieldNode::elementary("X", FieldKind::String, 0, 2)],
            vec![FieldNode::elementary("X", FieldKind::String, 2, 2)],
        ];
        let list = FieldNode::list("XS", reps, 0, 4);
        let value = serde_json::to_value(&list).unwrap();
        assert_eq!(value["type"], "list");
        assert_eq!(value["occurs"], 2);
        assert_eq!(value["data"][1][0]["start"], 2);
    }

    #[test]
    fn test_redefinition_round_trips_through_json() {
        let field = FieldNode::elementary("B", FieldKind::Number, 0, 4).with_redefines("A-1");
        let json = serde_json::to_string(&field).unwrap();
        let parsed: FieldNode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.redefines.as_deref(), Some("a_1"));
        assert_eq!(parsed, field);
    }

    #[test]
    fn test_find_descends_into_first_repetition() {
        let reps = vec![
            vec![FieldNode::elementary("ITEM", FieldKind::String, 0, 5)],
            vec![FieldNode::elementary("ITEM", FieldKind::String, 5, 5)],
        ];
        let record = RecordSchema {
            data: vec![FieldNode::group(
                "REC",
                vec![FieldNode::list("ITEMS", reps, 0, 10)],
                0,
                10,
            )],
            start: 0,
            length: 10,
        };
        assert_eq!(record.find("item").map(|f| f.start), Some(0));
        assert_eq!(record.field_count(), 4);
    }
}
