//! Timesheet export loading.
//!
//! Reads the JSON document (`{"data": [ ... ]}`) and validates every element
//! into a [`TimesheetRecord`] before anything downstream sees it.

use std::path::Path;

use serde_json::{Map, Number, Value};
use timesheet_core::models::TimesheetRecord;
use timesheet_core::{Result, TimesheetError};
use tracing::debug;

/// Key fields every record must carry.
pub const REQUIRED_TEXT_FIELDS: [&str; 5] = [
    "Employee",
    "Project_No",
    "Client",
    "Activity",
    "Project_Description",
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Read and validate the timesheet export at `path`.
///
/// Fails with [`TimesheetError::MissingSourceFile`] when the file is absent,
/// and with a parse / document / record error when its content is unusable.
pub fn load_source(path: &Path) -> Result<Vec<TimesheetRecord>> {
    if !path.exists() {
        return Err(TimesheetError::MissingSourceFile(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| TimesheetError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let records = parse_document(&content)?;
    debug!(
        "Loaded {} records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

/// Parse an in-memory export. Only the top-level `data` key is consumed.
pub fn parse_document(content: &str) -> Result<Vec<TimesheetRecord>> {
    let document: Value = serde_json::from_str(content)?;

    let items = document
        .as_object()
        .ok_or_else(|| TimesheetError::InvalidDocument("top level is not an object".into()))?
        .get("data")
        .ok_or_else(|| TimesheetError::InvalidDocument("missing 'data' key".into()))?
        .as_array()
        .ok_or_else(|| TimesheetError::InvalidDocument("'data' is not an array".into()))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_record(index, item))
        .collect()
}

/// Validate one element of the `data` array.
///
/// Key fields must be present and hold a string (numbers are accepted and
/// rendered as text, since project numbers are often exported unquoted).
/// `Hours` is kept as `None` when it cannot be read as a number.
pub fn parse_record(index: usize, item: &Value) -> Result<TimesheetRecord> {
    let obj = item
        .as_object()
        .ok_or_else(|| TimesheetError::MalformedRecord {
            index,
            field: "<record>",
            reason: "is not a JSON object".to_string(),
        })?;

    let [employee, project_no, client, activity, project_description] = [
        text_field(obj, index, REQUIRED_TEXT_FIELDS[0])?,
        text_field(obj, index, REQUIRED_TEXT_FIELDS[1])?,
        text_field(obj, index, REQUIRED_TEXT_FIELDS[2])?,
        text_field(obj, index, REQUIRED_TEXT_FIELDS[3])?,
        text_field(obj, index, REQUIRED_TEXT_FIELDS[4])?,
    ];

    let hours = obj.get("Hours").and_then(numeric_value);
    if hours.is_none() {
        debug!(index, "record has no numeric Hours");
    }

    let staff_comment = match obj.get("Staff_Comment") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    Ok(TimesheetRecord {
        employee,
        project_no,
        client,
        activity,
        project_description,
        hours,
        staff_comment,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn text_field(obj: &Map<String, Value>, index: usize, field: &'static str) -> Result<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(number_text(n)),
        Some(Value::Null) | None => Err(TimesheetError::MalformedRecord {
            index,
            field,
            reason: "is missing".to_string(),
        }),
        Some(other) => Err(TimesheetError::MalformedRecord {
            index,
            field,
            reason: format!("has unsupported value {other}"),
        }),
    }
}

/// Render a numeric key so `700` and `700.0` produce the same text.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// Interpret a JSON value as hours: numbers directly, strings when they parse.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_item(employee: &str, hours: Value) -> Value {
        json!({
            "Employee": employee,
            "Project_No": "P1",
            "Client": "C1",
            "Activity": "Dev",
            "Project_Description": "Desc1",
            "Hours": hours,
            "Staff_Comment": "checked",
        })
    }

    // ── parse_document ────────────────────────────────────────────────────────

    #[test]
    fn test_parse_document_basic() {
        let doc = json!({"data": [sample_item("A", json!(3)), sample_item("B", json!(1.5))]});
        let records = parse_document(&doc.to_string()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].employee, "A");
        assert_eq!(records[0].hours, Some(3.0));
        assert_eq!(records[1].hours, Some(1.5));
        assert_eq!(records[0].staff_comment.as_deref(), Some("checked"));
    }

    #[test]
    fn test_parse_document_ignores_other_top_level_keys() {
        let doc = json!({"meta": {"exported": "2024-01-01"}, "data": [sample_item("A", json!(1))]});
        let records = parse_document(&doc.to_string()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_document_keeps_whitespace_for_aggregator() {
        let doc = json!({"data": [sample_item("  A ", json!(1))]});
        let records = parse_document(&doc.to_string()).unwrap();
        assert_eq!(records[0].employee, "  A ");
    }

    #[test]
    fn test_parse_document_empty_data() {
        let records = parse_document(r#"{"data": []}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_document_missing_data_key() {
        let err = parse_document(r#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, TimesheetError::InvalidDocument(_)));
    }

    #[test]
    fn test_parse_document_data_not_array() {
        let err = parse_document(r#"{"data": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, TimesheetError::InvalidDocument(_)));
    }

    #[test]
    fn test_parse_document_top_level_array() {
        let err = parse_document("[]").unwrap_err();
        assert!(matches!(err, TimesheetError::InvalidDocument(_)));
    }

    #[test]
    fn test_parse_document_invalid_json() {
        let err = parse_document("{not json").unwrap_err();
        assert!(matches!(err, TimesheetError::JsonParse(_)));
    }

    // ── parse_record ──────────────────────────────────────────────────────────

    #[test]
    fn test_parse_record_missing_key_field_fails() {
        let mut item = sample_item("A", json!(1));
        item.as_object_mut().unwrap().remove("Client");
        let err = parse_record(7, &item).unwrap_err();
        match err {
            TimesheetError::MalformedRecord { index, field, .. } => {
                assert_eq!(index, 7);
                assert_eq!(field, "Client");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_record_null_key_field_fails() {
        let mut item = sample_item("A", json!(1));
        item["Activity"] = Value::Null;
        assert!(matches!(
            parse_record(0, &item),
            Err(TimesheetError::MalformedRecord { field: "Activity", .. })
        ));
    }

    #[test]
    fn test_parse_record_bool_key_field_fails() {
        let mut item = sample_item("A", json!(1));
        item["Employee"] = json!(true);
        assert!(matches!(
            parse_record(0, &item),
            Err(TimesheetError::MalformedRecord { field: "Employee", .. })
        ));
    }

    #[test]
    fn test_parse_record_numeric_project_no_becomes_text() {
        let mut item = sample_item("A", json!(1));
        item["Project_No"] = json!(700);
        let rec = parse_record(0, &item).unwrap();
        assert_eq!(rec.project_no, "700");
    }

    #[test]
    fn test_parse_record_integral_float_key_matches_integer() {
        let mut item = sample_item("A", json!(1));
        item["Project_No"] = json!(700.0);
        assert_eq!(parse_record(0, &item).unwrap().project_no, "700");

        item["Project_No"] = json!(-3.0);
        assert_eq!(parse_record(0, &item).unwrap().project_no, "-3");

        item["Project_No"] = json!(700.5);
        assert_eq!(parse_record(0, &item).unwrap().project_no, "700.5");
    }

    #[test]
    fn test_parse_record_not_an_object() {
        assert!(matches!(
            parse_record(2, &json!("row")),
            Err(TimesheetError::MalformedRecord { index: 2, .. })
        ));
    }

    #[test]
    fn test_parse_record_hours_variants() {
        let cases = [
            (json!(2), Some(2.0)),
            (json!(-5), Some(-5.0)),
            (json!(" 3.25 "), Some(3.25)),
            (json!("abc"), None),
            (Value::Null, None),
            (json!(true), None),
        ];
        for (raw, expected) in cases {
            let rec = parse_record(0, &sample_item("A", raw.clone())).unwrap();
            assert_eq!(rec.hours, expected, "hours from {raw}");
        }
    }

    #[test]
    fn test_parse_record_missing_hours_is_none() {
        let mut item = sample_item("A", json!(1));
        item.as_object_mut().unwrap().remove("Hours");
        let rec = parse_record(0, &item).unwrap();
        assert!(rec.hours.is_none());
    }

    #[test]
    fn test_parse_record_staff_comment_optional() {
        let mut item = sample_item("A", json!(1));
        item["Staff_Comment"] = Value::Null;
        assert!(parse_record(0, &item).unwrap().staff_comment.is_none());
        item.as_object_mut().unwrap().remove("Staff_Comment");
        assert!(parse_record(0, &item).unwrap().staff_comment.is_none());
    }

    // ── load_source ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_source_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let doc = json!({"data": [sample_item("A", json!(4))]});
        std::fs::write(&path, doc.to_string()).unwrap();

        let records = load_source(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hours, Some(4.0));
    }

    #[test]
    fn test_load_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        let err = load_source(&path).unwrap_err();
        assert!(matches!(err, TimesheetError::MissingSourceFile(p) if p == path));
    }

    #[test]
    fn test_load_source_utf8_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let doc = json!({"data": [sample_item("Иванов И.", json!(8))]});
        std::fs::write(&path, doc.to_string()).unwrap();

        let records = load_source(&path).unwrap();
        assert_eq!(records[0].employee, "Иванов И.");
    }
}
