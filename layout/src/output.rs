//! Output formatting for schemas and reports.

use serde::{Deserialize, Serialize};

use copybook_schema_core::{FieldNode, RecordSchema};

use crate::LayoutRun;
use crate::report::LayoutReport;

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Markdown,
    Table,
}

impl OutputFormat {
    /// File extension for written schemas.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Markdown => "md",
            Self::Table => "txt",
        }
    }
}

/// Serializes `value` as JSON indented with four spaces.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::output::to_json_string;
///
/// let json = to_json_string(&vec![1, 2]).unwrap();
/// assert_eq!(json, "[\n    1,\n    2\n]");
/// ```
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Formats a bare field sequence (the `data` array of a record).
pub fn format_fields(fields: &[FieldNode], format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            to_json_string(fields).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(fields).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(fields_to_markdown(fields)),
        OutputFormat::Table => Ok(fields_to_table(fields)),
    }
}

/// Formats a record schema in the requested output format.
pub fn format_record(record: &RecordSchema, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            to_json_string(record).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(record).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(format!(
            "**Record length:** {}\n\n{}",
            record.length,
            fields_to_markdown(&record.data)
        )),
        OutputFormat::Table => Ok(format!(
            "Record length: {}\n{}",
            record.length,
            fields_to_table(&record.data)
        )),
    }
}

/// Formats a conversion report in the requested output format.
pub fn format_report(report: &LayoutReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => {
            to_json_string(report).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(report_to_markdown(report)),
        OutputFormat::Table => Ok(report_to_table(report)),
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    schema: &'a RecordSchema,
    report: &'a LayoutReport,
}

/// Formats a schema together with its report.
pub fn format_run(run: &LayoutRun, format: OutputFormat) -> Result<String, String> {
    let output = RunOutput {
        schema: &run.record,
        report: &run.report,
    };
    match format {
        OutputFormat::Json => {
            to_json_string(&output).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(&output).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown | OutputFormat::Table => Ok(format!(
            "{}\n{}",
            format_record(&run.record, format)?,
            format_report(&run.report, format)?
        )),
    }
}

/// One display row per node; lists show their first repetition only.
struct Row {
    depth: usize,
    name: String,
    kind: String,
    start: usize,
    length: usize,
    note: String,
}

fn collect_rows(fields: &[FieldNode], depth: usize, rows: &mut Vec<Row>) {
    for field in fields {
        let note = match (&field.redefines, field.occurs) {
            (Some(target), _) => format!("redefines {target}"),
            (None, Some(occurs)) => format!("occurs {occurs}"),
            (None, None) => String::new(),
        };
        rows.push(Row {
            depth,
            name: field.name.clone(),
            kind: field.kind.to_string(),
            start: field.start,
            length: field.length,
            note,
        });
        if let Some(children) = &field.children {
            collect_rows(children.primary(), depth + 1, rows);
        }
    }
}

fn fields_to_markdown(fields: &[FieldNode]) -> String {
    let mut rows = Vec::new();
    collect_rows(fields, 0, &mut rows);

    let mut out = String::new();
    out.push_str("| Field | Type | Start | Length | Notes |\n");
    out.push_str("|-------|------|-------|--------|-------|\n");
    for row in &rows {
        let indent = "&nbsp;&nbsp;".repeat(row.depth);
        out.push_str(&format!(
            "| {indent}`{}` | {} | {} | {} | {} |\n",
            row.name, row.kind, row.start, row.length, row.note
        ));
    }
    out
}

fn fields_to_table(fields: &[FieldNode]) -> String {
    let mut rows = Vec::new();
    collect_rows(fields, 0, &mut rows);

    let max_name = rows
        .iter()
        .map(|row| row.name.len() + row.depth * 2)
        .max()
        .unwrap_or(4)
        .max(4);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<width$}  {:<6} {:>6} {:>6}  NOTES\n",
        "NAME",
        "TYPE",
        "START",
        "LENGTH",
        width = max_name
    ));
    for row in &rows {
        let name = format!("{}{}", "  ".repeat(row.depth), row.name);
        out.push_str(
            format!(
                "{:<width$}  {:<6} {:>6} {:>6}  {}",
                name,
                row.kind,
                row.start,
                row.length,
                row.note,
                width = max_name
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn report_to_markdown(report: &LayoutReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Conversion Report: {}\n\n", report.copybook));
    out.push_str(&format!(
        "- **Success:** {}\n",
        if report.success { "yes" } else { "no" }
    ));
    out.push_str(&format!("- **Token lines:** {}\n", report.token_lines));
    out.push_str(&format!("- **Fields:** {}\n", report.field_count));
    out.push_str(&format!("- **Record length:** {}\n", report.record_length));

    if let Some(ref code) = report.failure_code {
        out.push_str(&format!("- **Failure Code:** {code}\n"));
    }
    if let Some(ref detail) = report.failure_detail {
        out.push_str(&format!("- **Failure Detail:** {detail}\n"));
    }

    if !report.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for w in &report.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    if !report.validation_errors.is_empty() {
        out.push_str("\n## Validation Errors\n\n");
        for e in &report.validation_errors {
            out.push_str(&format!("- {e}\n"));
        }
    }

    out
}

fn report_to_table(report: &LayoutReport) -> String {
    let mut out = String::new();
    let status = if report.success { "OK" } else { "FAIL" };
    out.push_str(&format!(
        "{:<20} {:<6} fields={} length={} diagnostics={}",
        report.copybook,
        status,
        report.field_count,
        report.record_length,
        report.diagnostics.len(),
    ));
    if let Some(ref code) = report.failure_code {
        out.push_str(&format!("  [{code}]"));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FailureCode;
    use crate::{LayoutOptions, parse_copybook, parse_copybook_with_report};

    const SAMPLE: &str = "\
01 REC.
  05 FIELD-A PIC X(5).
  05 FIELD-B PIC 9(3).
  05 FIELD-C REDEFINES FIELD-B PIC X(3).
  05 ITEMS OCCURS 2.
    10 CODE PIC X.
";

    #[test]
    fn test_json_uses_fixed_key_order() {
        let record = parse_copybook("05 FIELD-A PIC X(5).");
        let json = format_fields(&record.data, OutputFormat::Json).unwrap();
        let expected = "\
[
    {
        \"name\": \"field_a\",
        \"copybook_name\": \"FIELD-A\",
        \"type\": \"string\",
        \"start\": 0,
        \"length\": 5
    }
]";
        assert_eq!(json, expected);
    }

    #[test]
    fn test_json_nests_repetitions() {
        let record = parse_copybook(SAMPLE);
        let json = format_record(&record, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let items = &value["data"][0]["data"][3];
        assert_eq!(items["occurs"], 2);
        assert_eq!(items["data"].as_array().unwrap().len(), 2);
        assert_eq!(items["data"][1][0]["start"], 9);
        assert_eq!(value["data"][0]["data"][2]["redefines"], "field_b");
    }

    #[test]
    fn test_yaml_output() {
        let record = parse_copybook(SAMPLE);
        let yaml = format_record(&record, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("copybook_name: FIELD-A"));
        assert!(yaml.contains("length: 10"));
    }

    #[test]
    fn test_markdown_lists_nested_rows() {
        let record = parse_copybook(SAMPLE);
        let md = format_record(&record, OutputFormat::Markdown).unwrap();
        assert!(md.contains("**Record length:** 10"));
        assert!(md.contains("| `rec` | group | 0 | 10 |  |"));
        assert!(md.contains("redefines field_b"));
        assert!(md.contains("occurs 2"));
    }

    #[test]
    fn test_table_shows_one_row_per_field() {
        let record = parse_copybook(SAMPLE);
        let table = format_fields(&record.data, OutputFormat::Table).unwrap();
        // header + rec, four children, one code row
        assert_eq!(table.lines().count(), 7);
        assert!(table.lines().any(|l| l.starts_with("    code")));
    }

    #[test]
    fn test_report_formats() {
        let mut run = parse_copybook_with_report("sample", SAMPLE, &LayoutOptions::default());
        let md = format_report(&run.report, OutputFormat::Markdown).unwrap();
        assert!(md.contains("# Conversion Report: sample"));
        assert!(md.contains("**Success:** yes"));

        run.report.fail(FailureCode::EmptyLayout, "nothing");
        let table = format_report(&run.report, OutputFormat::Table).unwrap();
        assert!(table.contains("FAIL"));
        assert!(table.contains("[empty_layout]"));
    }

    #[test]
    fn test_run_json_holds_schema_and_report() {
        let run = parse_copybook_with_report("sample", SAMPLE, &LayoutOptions::default());
        let json = format_run(&run, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["schema"]["length"], 10);
        assert_eq!(value["report"]["copybook"], "sample");
    }

    #[test]
    fn test_format_serde_names() {
        assert_eq!(serde_json::to_string(&OutputFormat::Markdown).unwrap(), "\"markdown\"");
        assert_eq!(OutputFormat::Yaml.extension(), "yaml");
    }
}
