//! Structured conversion reporting.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;

/// Structured failure code for conversions that did not produce a usable
/// schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// The copybook produced no fields.
    EmptyLayout,
    /// The schema was built but failed structural validation.
    ValidationFailed,
    /// The copybook could not be read.
    ReadFailed,
    /// The schema could not be written.
    WriteFailed,
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLayout => write!(f, "empty_layout"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ReadFailed => write!(f, "read_failed"),
            Self::WriteFailed => write!(f, "write_failed"),
        }
    }
}

/// Per-copybook conversion report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutReport {
    pub copybook: String,
    pub success: bool,
    /// Structured failure code when the conversion did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<FailureCode>,
    /// Human-readable detail about the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_detail: Option<String>,
    /// Token-lines left after comment and blank lines were dropped.
    pub token_lines: usize,
    /// Nodes in the schema, every list repetition included.
    pub field_count: usize,
    pub record_length: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub warnings: Vec<String>,
    pub validation_errors: Vec<String>,
}

impl LayoutReport {
    /// Report for a copybook that failed before a layout was built.
    pub fn failed(copybook: impl Into<String>, code: FailureCode, detail: impl Into<String>) -> Self {
        Self {
            copybook: copybook.into(),
            success: false,
            failure_code: Some(code),
            failure_detail: Some(detail.into()),
            token_lines: 0,
            field_count: 0,
            record_length: 0,
            diagnostics: Vec::new(),
            warnings: Vec::new(),
            validation_errors: Vec::new(),
        }
    }

    /// Marks the report as failed, keeping the computed metrics.
    pub fn fail(&mut self, code: FailureCode, detail: impl Into<String>) {
        self.success = false;
        self.failure_code = Some(code);
        self.failure_detail = Some(detail.into());
    }
}

/// Batch report for a multi-copybook conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutReportBundle {
    /// Schema contract version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    pub generated_at: String,
    pub version: String,
    pub reports: Vec<LayoutReport>,
    pub failures: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    #[test]
    fn test_failure_code_display_matches_serde() {
        let codes = [
            (FailureCode::EmptyLayout, "empty_layout"),
            (FailureCode::ValidationFailed, "validation_failed"),
            (FailureCode::ReadFailed, "read_failed"),
            (FailureCode::WriteFailed, "write_failed"),
        ];

        for (code, expected) in codes {
            assert_eq!(code.to_string(), expected);
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{expected}\""));
            let back: FailureCode = serde_json::from_str(&json).unwrap();
            assert_eq!(back, code);
        }
    }

    #[test]
    fn test_report_omits_none_failure_fields() {
        let report = LayoutReport {
            copybook: "custrec".to_string(),
            success: true,
            failure_code: None,
            failure_detail: None,
            token_lines: 3,
            field_count: 3,
            record_length: 8,
            diagnostics: vec![Diagnostic {
                line: 4,
                kind: DiagnosticKind::ConditionNameSkipped,
                detail: "88 ACTIVE".to_string(),
            }],
            warnings: Vec::new(),
            validation_errors: Vec::new(),
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("failure_code"));
        assert!(!json.contains("failure_detail"));
        assert!(json.contains("\"kind\":\"condition_name_skipped\""));
    }

    #[test]
    fn test_failed_report_carries_code() {
        let report = LayoutReport::failed("missing", FailureCode::ReadFailed, "no such file");
        assert!(!report.success);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"failure_code\":\"read_failed\""));
        assert!(json.contains("no such file"));
    }
}
