//! Serialization helpers: CSV quoting, JSON conversion, and the
//! date↔string primitives spec §1 treats as an external collaborator
//! ("stateless string↔date functions") and §9 requires to take an
//! explicit format string rather than a locale-sensitive default.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::record::Record;
use crate::value::Value;

/// Quotes a CSV field per RFC 4180: quote if it contains the delimiter, a
/// quote character, or a newline; double any embedded quotes.
pub fn quote_csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Renders a value as a CSV/plain-text field. `Absent`/`Null` render as
/// the empty string (there is no quoting distinction core CSV output makes
/// between "missing" and "null").
pub fn value_to_plain_string(v: &Value) -> String {
    match v {
        Value::Absent | Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.to_string(),
        Value::Date(d) => d.to_string(),
        Value::DateTime(dt) => dt.to_rfc3339(),
        Value::Record(_) => "[record]".to_string(),
        Value::Series(_) => "[series]".to_string(),
        Value::Frame(_) => "[frame]".to_string(),
    }
}

/// Renders a record as one CSV line (no trailing newline), following
/// `columns`' order.
pub fn record_to_csv_row(record: &Record, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_csv_field(&value_to_plain_string(&record.get_or_absent(c))))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn csv_header(columns: &[String]) -> String {
    columns.iter().map(|c| quote_csv_field(c)).collect::<Vec<_>>().join(",")
}

/// Converts a `Value` to a `serde_json::Value`. `Absent` and `Null` both
/// serialize as JSON `null` — JSON has no third state — which is why
/// `toPairs`/`toValues` filtering absent values upstream of serialization
/// matters (spec §6 "Pair serialization").
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Absent | Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.to_string()),
        Value::Date(d) => serde_json::Value::String(d.to_string()),
        Value::DateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
        Value::Record(r) => {
            let map = r.iter().map(|(k, v)| (k.to_string(), value_to_json(v))).collect();
            serde_json::Value::Object(map)
        }
        Value::Series(_) => serde_json::Value::String("[series]".to_string()),
        Value::Frame(_) => serde_json::Value::String("[frame]".to_string()),
    }
}

/// Parses a date using an explicit `chrono` format string (spec §9: no
/// locale-sensitive default).
pub fn parse_date(s: &str, fmt: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, fmt).map_err(|e| Error::InvalidArgument(format!("invalid date '{s}' for format '{fmt}': {e}")))
}

/// Formats a date with an explicit `chrono` format string.
pub fn format_date(d: &NaiveDate, fmt: &str) -> String {
    d.format(fmt).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_quoting_follows_rfc_4180() {
        assert_eq!(quote_csv_field("plain"), "plain");
        assert_eq!(quote_csv_field("a,b"), "\"a,b\"");
        assert_eq!(quote_csv_field("has \"quote\""), "\"has \"\"quote\"\"\"");
        assert_eq!(quote_csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn absent_and_null_render_as_empty_string() {
        assert_eq!(value_to_plain_string(&Value::Absent), "");
        assert_eq!(value_to_plain_string(&Value::Null), "");
    }

    #[test]
    fn record_to_csv_row_follows_column_order() {
        let record = Record::new().with("b", Value::int(2)).with("a", Value::int(1));
        let row = record_to_csv_row(&record, &["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(row, "1,2,");
    }

    #[test]
    fn date_round_trips_through_an_explicit_format() {
        let d = parse_date("2026-07-28", "%Y-%m-%d").unwrap();
        assert_eq!(format_date(&d, "%Y-%m-%d"), "2026-07-28");
    }

    #[test]
    fn invalid_date_is_invalid_argument() {
        assert!(matches!(parse_date("not-a-date", "%Y-%m-%d"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn absent_and_null_serialize_as_json_null() {
        assert_eq!(value_to_json(&Value::Absent), serde_json::Value::Null);
        assert_eq!(value_to_json(&Value::Null), serde_json::Value::Null);
    }
}
