//! JSON response formatting.

use bytes::Bytes;
use sqlrest_core::record::{record_to_json, Record};

/// Format rows as a JSON array.
pub fn format_json_response(rows: &[Record]) -> Bytes {
    let values: Vec<serde_json::Value> = rows.iter().map(record_to_json).collect();
    Bytes::from(serde_json::to_vec(&values).expect("Record -> JSON never fails"))
}

/// Format a single row as a JSON object (§4.5 single-object modifier).
pub fn format_json_object(row: &Record) -> Bytes {
    Bytes::from(serde_json::to_vec(&record_to_json(row)).expect("Record -> JSON never fails"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlrest_core::record::RecordValue;

    fn row(id: i64, name: &str) -> Record {
        let mut r = Record::new();
        r.insert("id".into(), RecordValue::Int(id));
        r.insert("name".into(), RecordValue::Text(name.into()));
        r
    }

    #[test]
    fn formats_array_of_rows() {
        let rows = vec![row(1, "Alice"), row(2, "Bob")];
        let result = format_json_response(&rows);
        let parsed: Vec<serde_json::Value> = serde_json::from_slice(&result).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["name"], "Alice");
    }

    #[test]
    fn formats_single_object() {
        let result = format_json_object(&row(1, "Alice"));
        let parsed: serde_json::Value = serde_json::from_slice(&result).unwrap();
        assert_eq!(parsed["name"], "Alice");
    }

    #[test]
    fn empty_rows_render_empty_array() {
        let result = format_json_response(&[]);
        assert_eq!(&result[..], b"[]");
    }
}
