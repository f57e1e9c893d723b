//! Diagnostics for lines the builder skips or degrades.
//!
//! None of these stop a build: each records a line that produced no node, or
//! produced one with a fallback offset, so callers can tell a clean layout
//! from a best-effort one.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Level-88 condition name; not modeled in the schema.
    ConditionNameSkipped,
    /// REDEFINES target not found in scope; the overlay was anchored at 0.
    UnresolvedRedefinition,
    /// Line shape not recognized; no node produced.
    UnrecognizedLine,
    /// Group line without descendants; no node produced.
    EmptyGroup,
    /// OCCURS on an elementary item; built as a single occurrence.
    ElementaryOccursIgnored,
    /// Size, end offset or OCCURS expansion out of range; no node produced.
    SizeOutOfRange,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConditionNameSkipped => write!(f, "condition_name_skipped"),
            Self::UnresolvedRedefinition => write!(f, "unresolved_redefinition"),
            Self::UnrecognizedLine => write!(f, "unrecognized_line"),
            Self::EmptyGroup => write!(f, "empty_group"),
            Self::ElementaryOccursIgnored => write!(f, "elementary_occurs_ignored"),
            Self::SizeOutOfRange => write!(f, "size_out_of_range"),
        }
    }
}

/// One diagnostic tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based source line number.
    pub line: usize,
    pub kind: DiagnosticKind,
    /// Line text or the unresolved target name.
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutDiagnostics {
    entries: Vec<Diagnostic>,
}

impl LayoutDiagnostics {
    pub fn push(&mut self, line: usize, kind: DiagnosticKind, detail: impl Into<String>) {
        self.entries.push(Diagnostic {
            line,
            kind,
            detail: detail.into(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries, used as a rollback mark.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops entries recorded after `mark`.
    pub fn truncate(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Details of every entry of `kind`, in source order.
    pub fn details(&self, kind: DiagnosticKind) -> Vec<String> {
        self.entries
            .iter()
            .filter(|d| d.kind == kind)
            .map(|d| format!("line {}: {}", d.line, d.detail))
            .collect()
    }

    /// Human-readable summary lines.
    ///
    /// Skipped condition names are expected in real copybooks and are not
    /// reported here.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for entry in &self.entries {
            if entry.kind == DiagnosticKind::UnresolvedRedefinition {
                warnings.push(format!(
                    "line {}: REDEFINES target '{}' not found; overlay anchored at offset 0",
                    entry.line, entry.detail
                ));
            }
        }

        let unrecognized = self.count(DiagnosticKind::UnrecognizedLine);
        if unrecognized > 0 {
            warnings.push(format!("Ignored {unrecognized} unrecognized line(s)"));
        }

        let empty_groups = self.count(DiagnosticKind::EmptyGroup);
        if empty_groups > 0 {
            warnings.push(format!(
                "Ignored {empty_groups} group line(s) without subordinate items"
            ));
        }

        let occurs = self.count(DiagnosticKind::ElementaryOccursIgnored);
        if occurs > 0 {
            warnings.push(format!(
                "OCCURS on {occurs} elementary item(s) was not expanded"
            ));
        }

        let oversized = self.count(DiagnosticKind::SizeOutOfRange);
        if oversized > 0 {
            warnings.push(format!(
                "Skipped {oversized} item(s) whose size or repetition count is out of range"
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display_matches_serde() {
        let kinds = [
            (DiagnosticKind::ConditionNameSkipped, "condition_name_skipped"),
            (DiagnosticKind::UnresolvedRedefinition, "unresolved_redefinition"),
            (DiagnosticKind::UnrecognizedLine, "unrecognized_line"),
            (DiagnosticKind::EmptyGroup, "empty_group"),
            (DiagnosticKind::ElementaryOccursIgnored, "elementary_occurs_ignored"),
            (DiagnosticKind::SizeOutOfRange, "size_out_of_range"),
        ];

        for (kind, expected) in kinds {
            assert_eq!(kind.to_string(), expected);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{expected}\""));
        }
    }

    #[test]
    fn test_warnings_skip_condition_names() {
        let mut diagnostics = LayoutDiagnostics::default();
        diagnostics.push(3, DiagnosticKind::ConditionNameSkipped, "88 ACTIVE");
        assert!(diagnostics.warnings().is_empty());

        diagnostics.push(7, DiagnosticKind::UnresolvedRedefinition, "GHOST");
        diagnostics.push(9, DiagnosticKind::UnrecognizedLine, "COPY X");
        let warnings = diagnostics.warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("'GHOST'"));
    }

    #[test]
    fn test_truncate_rolls_back_to_mark() {
        let mut diagnostics = LayoutDiagnostics::default();
        diagnostics.push(1, DiagnosticKind::EmptyGroup, "05 A");
        let mark = diagnostics.len();
        diagnostics.push(2, DiagnosticKind::EmptyGroup, "05 B");
        diagnostics.truncate(mark);
        assert_eq!(diagnostics.details(DiagnosticKind::EmptyGroup), vec!["line 1: 05 A"]);
    }
}
