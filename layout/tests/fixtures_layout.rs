use std::fs;
use std::path::PathBuf;

use copybook_schema_core::{FieldKind, FieldNode, validate_record};
use copybook_schema_layout::diagnostics::DiagnosticKind;
use copybook_schema_layout::output::{OutputFormat, format_fields};
use copybook_schema_layout::{LayoutOptions, parse_copybook, parse_copybook_with_report};

#[test]
fn test_customer_master_offsets() {
    let record = parse_copybook(&fixture("custmast.cpy"));
    assert_eq!(record.length, 137);
    assert_eq!(record.data.len(), 1);

    let master = &record.data[0];
    assert_eq!(master.name, "customer_master");
    assert_eq!(master.kind, FieldKind::Group);

    let expected = [
        ("cust_id", FieldKind::Number, 0, 8),
        ("cust_status", FieldKind::String, 8, 1),
        ("cust_name", FieldKind::Group, 9, 35),
        ("open_date", FieldKind::Number, 44, 8),
        ("open_date_r", FieldKind::Group, 44, 8),
        ("balance", FieldKind::Binary, 52, 6),
        ("credit_limit", FieldKind::Binary, 58, 4),
        ("phone_count", FieldKind::Number, 62, 1),
        ("phones", FieldKind::List, 63, 39),
        ("notes", FieldKind::String, 102, 30),
        ("filler", FieldKind::String, 132, 5),
    ];
    let actual: Vec<_> = master.fields().iter().map(summary).collect();
    let expected: Vec<_> = expected
        .iter()
        .map(|(name, kind, start, length)| (name.to_string(), *kind, *start, *length))
        .collect();
    assert_eq!(actual, expected);

    assert!(validate_record(&record).is_empty());
}

#[test]
fn test_customer_master_overlay_and_table() {
    let record = parse_copybook(&fixture("custmast.cpy"));

    let overlay = record.find("OPEN-DATE-R").expect("overlay should be built");
    assert_eq!(overlay.redefines.as_deref(), Some("open_date"));
    let parts: Vec<_> = overlay.fields().iter().map(summary).collect();
    assert_eq!(
        parts,
        vec![
            ("open_yyyy".to_string(), FieldKind::Number, 44, 4),
            ("open_mm".to_string(), FieldKind::Number, 48, 2),
            ("open_dd".to_string(), FieldKind::Number, 50, 2),
        ]
    );

    let phones = record.find("PHONES").expect("table should be built");
    assert_eq!(phones.occurs, Some(3));
    let numbers: Vec<usize> = phones
        .repetitions()
        .iter()
        .map(|rep| rep[1].start)
        .collect();
    assert_eq!(numbers, vec![64, 77, 90]);
}

#[test]
fn test_customer_master_report() {
    let run = parse_copybook_with_report(
        "custmast",
        &fixture("custmast.cpy"),
        &LayoutOptions::default(),
    );
    assert!(run.report.success);
    assert_eq!(run.report.token_lines, 21);
    assert_eq!(run.report.record_length, 137);
    assert_eq!(run.report.diagnostics.len(), 2);
    assert!(
        run.report
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::ConditionNameSkipped)
    );
    assert!(run.report.warnings.is_empty());
    assert!(run.report.validation_errors.is_empty());
}

#[test]
fn test_orders_with_sequence_area() {
    let options = LayoutOptions::with_padding(6);
    let run = parse_copybook_with_report("orders", &fixture("orders.cpy"), &options);
    assert!(run.report.success);
    assert_eq!(run.record.length, 108);

    let lines = run.record.find("ORDER-LINES").expect("table should be built");
    assert_eq!(lines.occurs, Some(5));
    assert_eq!((lines.start, lines.length), (12, 90));
    let skus: Vec<usize> = lines.repetitions().iter().map(|rep| rep[0].start).collect();
    assert_eq!(skus, vec![12, 30, 48, 66, 84]);

    let qty = &lines.repetitions()[0][1];
    assert_eq!((qty.kind, qty.length), (FieldKind::Binary, 3));

    let total = run.record.find("ORDER-TOTAL").expect("total should be built");
    assert_eq!((total.start, total.length), (102, 6));
}

#[test]
fn test_data_array_json_shape() {
    let record = parse_copybook(&fixture("custmast.cpy"));
    let json = format_fields(&record.data, OutputFormat::Json).expect("json should render");
    assert!(json.starts_with("[\n    {\n        \"name\": \"customer_master\","));

    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let phones = &value[0]["data"][8];
    assert_eq!(phones["type"], "list");
    assert_eq!(phones["occurs"], 3);
    assert_eq!(phones["data"][2][0]["copybook_name"], "PHONE-TYPE");
    assert_eq!(phones["data"][2][0]["start"], 89);
    assert!(value[0]["data"][0].get("redefines").is_none());
}

#[test]
fn test_removing_overlays_keeps_offsets() {
    let text = fixture("custmast.cpy");
    let without: String = text
        .lines()
        .filter(|line| {
            !line.contains("OPEN-DATE-R") && !line.contains("OPEN-YYYY")
                && !line.contains("OPEN-MM")
                && !line.contains("OPEN-DD")
        })
        .map(|line| format!("{line}\n"))
        .collect();

    let with = parse_copybook(&text);
    let without = parse_copybook(&without);
    assert_eq!(with.length, without.length);

    let kept: Vec<_> = with.data[0]
        .fields()
        .iter()
        .filter(|f| !f.is_redefinition())
        .map(summary)
        .collect();
    let plain: Vec<_> = without.data[0].fields().iter().map(summary).collect();
    assert_eq!(kept, plain);
}

fn summary(field: &FieldNode) -> (String, FieldKind, usize, usize) {
    (field.name.clone(), field.kind, field.start, field.length)
}

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(path).expect("fixture file must be readable")
}
