//! Core schema types and validation for COBOL copybook record layouts.
//!
//! This crate defines the output model of the layout engine:
//!
//! - [`FieldNode`]: one field with its kind, byte offset, byte length and,
//!   for groups and lists, its children.
//! - [`FieldKind`]: `string`, `number`, `binary`, `group` or `list`.
//! - [`RecordSchema`]: the top-level field sequence of one copybook plus the
//!   record's start and length.
//! - [`LayoutPackage`]: a versioned bundle of record schemas for
//!   distribution.
//!
//! Validation ([`validate_record`], [`validate_package`]) checks the
//! structural invariants: contiguous siblings, group and list lengths, and
//! list repetition counts.
//!
//! # Example
//!
//! ```
//! use copybook_schema_core::*;
//!
//! let record = RecordSchema {
//!     data: vec![FieldNode::group(
//!         "CUSTOMER",
//!         vec![
//!             FieldNode::elementary("CUST-ID", FieldKind::Number, 0, 6),
//!             FieldNode::elementary("CUST-NAME", FieldKind::String, 6, 30),
//!         ],
//!         0,
//!         36,
//!     )],
//!     start: 0,
//!     length: 36,
//! };
//!
//! assert_eq!(record.find("CUST-NAME").unwrap().start, 6);
//! assert!(validate_record(&record).is_empty());
//! ```

mod package;
mod types;
mod validate;

pub use package::{LayoutPackage, NamedLayout};
pub use types::*;
pub use validate::{ValidationError, validate_package, validate_record};
