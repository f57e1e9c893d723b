use serde::{Deserialize, Serialize};

use crate::RecordSchema;

/// Record schema tagged with the copybook it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLayout {
    /// Copybook base name (input file name up to its first `.`).
    pub copybook: String,
    /// Derived record schema.
    pub record: RecordSchema,
}

impl NamedLayout {
    /// Pairs a copybook name with its schema.
    pub fn new(copybook: impl Into<String>, record: RecordSchema) -> Self {
        Self {
            copybook: copybook.into(),
            record,
        }
    }
}

/// Serializable bundle of record schemas produced by one batch run.
///
/// # Examples
///
/// ```
/// use copybook_schema_core::*;
///
/// let mut package = LayoutPackage::new("1.0.0", "2026-01-15T10:30:00Z");
/// package.name = Some("billing".into());
/// package.layouts.push(NamedLayout::new("invoice", RecordSchema::default()));
/// package.layouts.push(NamedLayout::new("customer", RecordSchema::default()));
///
/// assert_eq!(package.layout_count(), 2);
/// assert!(package.get("customer").is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutPackage {
    /// Schema contract version (populated from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION)).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Package format version (semver string).
    pub version: String,
    /// Optional package name.
    pub name: Option<String>,
    /// Optional package description.
    pub description: Option<String>,
    /// ISO-8601 timestamp for package creation.
    pub generated_at: String,
    /// Record schemas included in this package.
    pub layouts: Vec<NamedLayout>,
}

impl LayoutPackage {
    /// Creates a package with required fields.
    ///
    /// The `schema_version` is automatically set from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION).
    pub fn new(version: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            schema_version: Some(crate::SCHEMA_CONTRACT_VERSION.to_string()),
            version: version.into(),
            name: None,
            description: None,
            generated_at: generated_at.into(),
            layouts: Vec::new(),
        }
    }

    /// Returns the number of layouts in this package.
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Looks up a layout by copybook name.
    pub fn get(&self, copybook: &str) -> Option<&RecordSchema> {
        self.layouts
            .iter()
            .find(|layout| layout.copybook == copybook)
            .map(|layout| &layout.record)
    }
}
