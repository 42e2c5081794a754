//! Type/value frequency introspection (SPEC_FULL.md §B): `detectTypes` and
//! `detectValues` summarize a series as a small frame of
//! `(label, frequency%)` rows, in first-occurrence order.

use std::rc::Rc;

use crate::dataframe::DataFrame;
use crate::format;
use crate::record::Record;
use crate::series::Series;
use crate::value::Value;

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Absent => "Absent",
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Int(_) | Value::Float(_) => "Number",
        Value::Str(_) => "String",
        Value::Date(_) | Value::DateTime(_) => "Date",
        Value::Record(_) => "Object",
        Value::Series(_) => "Series",
        Value::Frame(_) => "DataFrame",
    }
}

fn frequency_frame(labels: Vec<String>) -> DataFrame {
    let total = labels.len() as f64;
    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for label in labels {
        match order.iter().position(|o| o == &label) {
            Some(i) => counts[i] += 1,
            None => {
                order.push(label);
                counts.push(1);
            }
        }
    }
    let records: Vec<Record> = order
        .into_iter()
        .zip(counts)
        .map(|(label, count)| {
            let freq = if total > 0.0 { 100.0 * count as f64 / total } else { 0.0 };
            Record::from_pairs(vec![(Rc::from("label"), Value::str(label)), (Rc::from("frequency"), Value::Float(freq))])
        })
        .collect();
    DataFrame::from_records(records, true)
}

/// Every value's *type*, paired with how often that type appears (as a
/// percentage of all values, including absent slots).
pub fn detect_types(series: &Series) -> DataFrame {
    let labels = series.raw_values().into_iter().map(|v| type_name(&v).to_string()).collect();
    frequency_frame(labels)
}

/// Every distinct *value* (rendered as text), paired with its frequency.
pub fn detect_values(series: &Series) -> DataFrame {
    let labels = series.raw_values().into_iter().map(|v| format::value_to_plain_string(&v)).collect();
    frequency_frame(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_types_counts_types_including_absent() {
        let s = Series::from_values(vec![Value::Int(1), Value::str("x"), Value::Absent, Value::Int(2)]);
        let types = detect_types(&s);
        let rows = types.to_records();
        let lookup = |label: &str| rows.iter().find(|r| r.get_or_absent("label") == Value::str(label)).map(|r| r.get_or_absent("frequency"));
        assert_eq!(lookup("Number"), Some(Value::Float(50.0)));
        assert_eq!(lookup("String"), Some(Value::Float(25.0)));
        assert_eq!(lookup("Absent"), Some(Value::Float(25.0)));
    }

    #[test]
    fn detect_values_is_first_occurrence_ordered() {
        let s = Series::from_values(vec![Value::Int(2), Value::Int(1), Value::Int(2)]);
        let values = detect_values(&s);
        let labels: Vec<Value> = values.to_records().into_iter().map(|r| r.get_or_absent("label")).collect();
        assert_eq!(labels, vec![Value::str("2"), Value::str("1")]);
    }
}
