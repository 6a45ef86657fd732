//! Execution result export.
//!
//! Renders a succeeded execution's stored result set as CSV (RFC 4180 quoting)
//! or pretty-printed JSON.

use domain::models::{ExecutionResultSet, ExportFormat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Stored results are not a well-formed result set: {0}")]
    MalformedResults(#[from] serde_json::Error),
}

/// Renders stored execution results in the requested format.
pub fn render(results: &serde_json::Value, format: ExportFormat) -> Result<String, ExportError> {
    let result_set: ExecutionResultSet = serde_json::from_value(results.clone())?;

    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&result_set)?),
        ExportFormat::Csv => Ok(to_csv(&result_set)),
    }
}

fn to_csv(result_set: &ExecutionResultSet) -> String {
    let mut out = String::new();

    let header: Vec<String> = result_set.columns.iter().map(|c| escape_field(c)).collect();
    out.push_str(&header.join(","));
    out.push_str("\r\n");

    for row in &result_set.rows {
        let fields: Vec<String> = result_set
            .columns
            .iter()
            .map(|column| {
                let value = row.get(column).unwrap_or(&serde_json::Value::Null);
                escape_field(&value_to_field(value))
            })
            .collect();
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }

    out
}

fn value_to_field(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        // Nested structures are kept as their JSON text.
        other => other.to_string(),
    }
}

/// RFC 4180: quote fields containing commas, quotes, or line breaks; double any
/// embedded quotes.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_results() -> serde_json::Value {
        serde_json::to_value(ExecutionResultSet {
            columns: vec!["Make".to_string(), "Note".to_string(), "Units".to_string()],
            rows: vec![
                serde_json::json!({"Make": "Toyota", "Note": "steady", "Units": 12}),
                serde_json::json!({"Make": "Honda", "Note": "flagship, strong", "Units": 8}),
                serde_json::json!({"Make": "Ford", "Note": "the \"workhorse\"", "Units": null}),
            ],
            row_count: 3,
        })
        .unwrap()
    }

    #[test]
    fn test_csv_header_follows_column_order() {
        let csv = render(&sample_results(), ExportFormat::Csv).unwrap();
        let first_line = csv.lines().next().unwrap();
        assert_eq!(first_line, "Make,Note,Units");
    }

    #[test]
    fn test_csv_quotes_embedded_commas_and_quotes() {
        let csv = render(&sample_results(), ExportFormat::Csv).unwrap();
        assert!(csv.contains("\"flagship, strong\""));
        assert!(csv.contains("\"the \"\"workhorse\"\"\""));
        // Null renders as an empty field.
        assert!(csv.contains("Ford,\"the \"\"workhorse\"\"\",\r\n"));
    }

    #[test]
    fn test_json_round_trips_the_result_set() {
        let rendered = render(&sample_results(), ExportFormat::Json).unwrap();
        let parsed: ExecutionResultSet = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.row_count, 3);
        assert_eq!(parsed.columns.len(), 3);
    }

    #[test]
    fn test_malformed_results_are_rejected() {
        let err = render(&serde_json::json!("not a result set"), ExportFormat::Csv).unwrap_err();
        assert!(matches!(err, ExportError::MalformedResults(_)));
    }
}
