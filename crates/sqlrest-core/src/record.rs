//! Generic row representation shared by the query executor and the response
//! formatters.
//!
//! Row values are heterogeneously typed at scan time (§9: "a record is a
//! keyed container whose values are a tagged union"). `Record` is a
//! `BTreeMap` rather than an `IndexMap`: §3 states the mapping is
//! "insertion-order-irrelevant", and CSV/OpenAPI rendering want a
//! deterministic (alphabetical) key order anyway.

use std::collections::BTreeMap;

/// A single row, or an embedded relation's object.
pub type Record = BTreeMap<String, RecordValue>;

/// A dynamically typed scalar or nested value.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Object(Record),
    Array(Vec<RecordValue>),
}

impl RecordValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render as a JSON value for the `application/json` response path.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => {
                use base64::Engine;
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Self::Object(rec) => record_to_json(rec),
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(RecordValue::to_json).collect())
            }
        }
    }

    /// Render as the flat string CSV wants: empty for null, JSON-encoded
    /// for nested object/array values, raw string otherwise (§4.5 CSV rules).
    pub fn to_csv_field(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => {
                use base64::Engine;
                base64::engine::general_purpose::STANDARD.encode(b)
            }
            Self::Object(_) | Self::Array(_) => self.to_json().to_string(),
        }
    }
}

/// Render a [`Record`] as a JSON object, recursing through nested values.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = record
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    serde_json::Value::Object(map)
}

/// Decode a `sqlx::sqlite::SqliteRow` column into a [`RecordValue`] without
/// knowing the declared type ahead of time, by probing SQLite's dynamic
/// column type. Used by the query executor when scanning cursor output.
pub fn value_from_sqlite(row: &sqlx::sqlite::SqliteRow, idx: usize) -> RecordValue {
    use sqlx::{Column, Row, TypeInfo, ValueRef};

    let raw = match row.try_get_raw(idx) {
        Ok(v) => v,
        Err(_) => return RecordValue::Null,
    };

    if raw.is_null() {
        return RecordValue::Null;
    }

    let type_name = raw.type_info().name().to_ascii_uppercase();
    match type_name.as_str() {
        "INTEGER" | "BIGINT" | "INT" => row
            .try_get::<i64, _>(idx)
            .map(RecordValue::Int)
            .unwrap_or(RecordValue::Null),
        "REAL" | "DOUBLE" | "FLOAT" => row
            .try_get::<f64, _>(idx)
            .map(RecordValue::Float)
            .unwrap_or(RecordValue::Null),
        "BOOLEAN" | "BOOL" => row
            .try_get::<bool, _>(idx)
            .map(RecordValue::Bool)
            .unwrap_or(RecordValue::Null),
        "BLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(RecordValue::Bytes)
            .unwrap_or(RecordValue::Null),
        _ => {
            if let Ok(s) = row.try_get::<String, _>(idx) {
                RecordValue::Text(s)
            } else if let Ok(i) = row.try_get::<i64, _>(idx) {
                RecordValue::Int(i)
            } else if let Ok(f) = row.try_get::<f64, _>(idx) {
                RecordValue::Float(f)
            } else {
                RecordValue::Null
            }
        }
    }
}

/// Field name for the column name at `idx`, used alongside [`value_from_sqlite`].
pub fn column_name(row: &sqlx::sqlite::SqliteRow, idx: usize) -> String {
    use sqlx::{Column, Row};
    row.columns()[idx].name().to_string()
}
