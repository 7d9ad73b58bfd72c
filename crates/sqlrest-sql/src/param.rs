//! SQL parameter types.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A bound SQL parameter value.
///
/// Mirrors SQLite's storage classes plus a `Json` variant for values that
/// travel as JSON text, so call sites pass a `serde_json::Value` instead of
/// stringifying it by hand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SqlParam {
    /// NULL value
    Null,
    /// Boolean, bound as SQLite's 0/1 integer
    Bool(bool),
    /// Integer storage class
    Int(i64),
    /// Real storage class
    Float(f64),
    /// Text storage class
    Text(String),
    /// Blob storage class
    Bytes(Vec<u8>),
    /// JSON value, bound as text
    Json(JsonValue),
}

impl SqlParam {
    /// Create a text parameter.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Create an integer parameter.
    pub fn int(n: i64) -> Self {
        Self::Int(n)
    }

    /// Create a JSON parameter.
    pub fn json(v: JsonValue) -> Self {
        Self::Json(v)
    }

    /// Check if this is a NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<String> for SqlParam {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for SqlParam {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<i32> for SqlParam {
    fn from(n: i32) -> Self {
        Self::Int(n as i64)
    }
}

impl From<i64> for SqlParam {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for SqlParam {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for SqlParam {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<JsonValue> for SqlParam {
    fn from(v: JsonValue) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
