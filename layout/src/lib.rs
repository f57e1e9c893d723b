//! COBOL copybook layout computation.
//!
//! This crate turns copybook text into a [`RecordSchema`]: every field with
//! its semantic kind, byte offset, byte length and nesting. It handles nested
//! groups, OCCURS tables (one materialized field sequence per repetition)
//! and REDEFINES overlays of both groups and elementary items.
//!
//! # Main entry points
//!
//! - [`parse_copybook`]: tokenize and build with default options.
//! - [`parse_copybook_with_options`]: same, with a sequence-area padding.
//! - [`parse_copybook_with_report`]: also returns a [`LayoutReport`] with
//!   diagnostics and structural validation results.
//! - [`convert::convert_file`] and [`convert::convert_batch`]: file-based
//!   workflows writing schema JSON to disk.
//!
//! # Example
//!
//! ```
//! use copybook_schema_core::FieldKind;
//! use copybook_schema_layout::parse_copybook;
//!
//! let copybook = "\
//!        01  CUSTOMER-REC.
//!            05  CUST-ID         PIC 9(6).
//!            05  CUST-NAME       PIC X(30).
//!            05  BALANCE         PIC S9(7)V99 COMP-3.
//! ";
//!
//! let record = parse_copybook(copybook);
//! assert_eq!(record.length, 41);
//!
//! let balance = record.find("BALANCE").unwrap();
//! assert_eq!(balance.kind, FieldKind::Binary);
//! assert_eq!((balance.start, balance.length), (36, 5));
//! ```
//!
//! The core is free of I/O and never fails: lines it cannot interpret are
//! skipped and recorded as [`diagnostics`].

pub mod builder;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod picture;
pub mod redefines;
pub mod report;
pub mod tokenizer;

use copybook_schema_core::{RecordSchema, validate_record};
use serde::{Deserialize, Serialize};

pub use error::ConvertError;

use builder::LayoutBuilder;
use report::{FailureCode, LayoutReport};

/// Options for a single copybook parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutOptions {
    /// Leading columns dropped from every line before tokenizing (6 for
    /// fixed-format source with sequence numbers).
    #[serde(default)]
    pub padding: usize,
}

impl LayoutOptions {
    pub fn with_padding(padding: usize) -> Self {
        Self { padding }
    }
}

/// Result of a reported parse.
#[derive(Debug, Clone)]
pub struct LayoutRun {
    pub record: RecordSchema,
    pub report: LayoutReport,
}

/// Parses copybook text with default options.
pub fn parse_copybook(text: &str) -> RecordSchema {
    parse_copybook_with_options(text, &LayoutOptions::default())
}

/// Parses copybook text.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::{LayoutOptions, parse_copybook_with_options};
///
/// let text = "000100 01  REC.\n000200     05  CODE  PIC X(4).";
/// let record = parse_copybook_with_options(text, &LayoutOptions::with_padding(6));
/// assert_eq!(record.find("CODE").unwrap().length, 4);
/// ```
pub fn parse_copybook_with_options(text: &str, options: &LayoutOptions) -> RecordSchema {
    let lines = tokenizer::tokenize(text, options.padding);
    LayoutBuilder::new(&lines).build(0).into_record()
}

/// Parses copybook text and reports on the result.
///
/// The report is marked failed with [`FailureCode::EmptyLayout`] when no
/// field was produced and with [`FailureCode::ValidationFailed`] when the
/// schema breaks a structural invariant. The schema is returned either way.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::{LayoutOptions, parse_copybook_with_report};
///
/// let text = "01 REC.\n  05 FLAG PIC X.\n    88 ON-FLAG VALUE 'Y'.\n  05 AMT PIC 9(5).";
/// let run = parse_copybook_with_report("rec", text, &LayoutOptions::default());
/// assert!(run.report.success);
/// assert_eq!(run.report.record_length, 6);
/// assert_eq!(run.report.diagnostics.len(), 1);
/// ```
pub fn parse_copybook_with_report(name: &str, text: &str, options: &LayoutOptions) -> LayoutRun {
    let lines = tokenizer::tokenize(text, options.padding);
    let mut builder = LayoutBuilder::new(&lines);
    let record = builder.build(0).into_record();
    let diagnostics = builder.into_diagnostics();

    let validation_errors: Vec<String> = validate_record(&record)
        .iter()
        .map(ToString::to_string)
        .collect();

    let mut report = LayoutReport {
        copybook: name.to_string(),
        success: true,
        failure_code: None,
        failure_detail: None,
        token_lines: lines.len(),
        field_count: record.field_count(),
        record_length: record.length,
        diagnostics: diagnostics.entries().to_vec(),
        warnings: diagnostics.warnings(),
        validation_errors,
    };

    if record.is_empty() {
        report.fail(FailureCode::EmptyLayout, "Copybook produced no fields");
    } else if !report.validation_errors.is_empty() {
        let detail = format!(
            "Schema failed {} structural check(s)",
            report.validation_errors.len()
        );
        report.fail(FailureCode::ValidationFailed, detail);
    }

    LayoutRun { record, report }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_reports_empty_layout() {
        let run = parse_copybook_with_report("blank", "  \n* only comments\n", &LayoutOptions::default());
        assert!(run.record.data.is_empty());
        assert_eq!((run.record.start, run.record.length), (0, 0));
        assert!(!run.report.success);
        assert_eq!(run.report.failure_code, Some(FailureCode::EmptyLayout));
        assert_eq!(run.report.token_lines, 0);
    }

    #[test]
    fn test_report_counts_every_repetition() {
        let text = "01 REC.\n 05 ITEMS OCCURS 2.\n  10 CODE PIC X(3).\n  10 QTY PIC 9(2).";
        let run = parse_copybook_with_report("items", text, &LayoutOptions::default());
        assert!(run.report.success);
        // REC, ITEMS, then CODE and QTY per repetition.
        assert_eq!(run.report.field_count, 6);
        assert_eq!(run.report.record_length, 10);
        assert_eq!(run.report.token_lines, 4);
    }

    #[test]
    fn test_unresolved_redefinition_is_warned() {
        let text = "05 A PIC X(2).\n05 B REDEFINES NOPE PIC X(2).";
        let run = parse_copybook_with_report("bad", text, &LayoutOptions::default());
        assert!(run.report.success);
        assert_eq!(run.report.warnings.len(), 1);
        assert!(run.report.warnings[0].contains("'NOPE'"));
    }

    #[test]
    fn test_oversized_items_degrade_to_warnings() {
        let text = "01 REC.\n 05 A PIC X(18446744073709551615).\n 05 B PIC X.\n 05 T OCCURS 999999999999999.\n  10 V PIC X.";
        let run = parse_copybook_with_report("huge", text, &LayoutOptions::default());
        assert!(run.report.success);
        assert_eq!(run.record.field_count(), 2);
        assert_eq!(run.report.record_length, usize::MAX);
        assert_eq!(
            run.report.warnings,
            vec!["Skipped 2 item(s) whose size or repetition count is out of range"]
        );
    }

    #[test]
    fn test_options_default_to_no_padding() {
        assert_eq!(LayoutOptions::default().padding, 0);
        let record = parse_copybook("05 A PIC X(3).");
        assert_eq!(record.length, 3);
    }
}
