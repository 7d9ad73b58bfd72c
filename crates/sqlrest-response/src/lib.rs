//! Response formatting for sqlrest.
//!
//! Handles content negotiation and response rendering for JSON, the
//! PostgREST single-object media type, and CSV (§4.5, §6).

mod headers;
mod json;

pub use headers::ContentRange;
pub use json::{format_json_object, format_json_response};

use http::{HeaderMap, HeaderValue, StatusCode};
use sqlrest_core::api_request::Accept;
use sqlrest_core::record::Record;

/// A formatted HTTP response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: bytes::Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<bytes::Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, bytes::Bytes::new())
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        if let Ok(v) = HeaderValue::from_str(value) {
            if let Ok(name) = http::header::HeaderName::from_bytes(name.as_bytes()) {
                self.headers.insert(name, v);
            }
        }
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header("content-type", content_type);
    }

    pub fn set_content_range(&mut self, range: &ContentRange) {
        self.set_header("content-range", &range.to_string());
    }

    pub fn set_location(&mut self, location: &str) {
        self.set_header("location", location);
    }
}

/// What the orchestrator has already decided about one response, independent
/// of how it gets rendered on the wire (§4.5).
#[derive(Clone, Debug)]
pub struct QueryResult {
    pub status: StatusCode,
    pub rows: Vec<Record>,
    pub content_range: Option<ContentRange>,
    pub location: Option<String>,
}

/// Render `result` for the negotiated `accept` media type (§6). `HEAD`
/// requests are the caller's concern — drop the body after building it.
pub fn format_response(accept: Accept, result: &QueryResult) -> Result<Response, FormatError> {
    let (body, content_type) = match accept {
        Accept::Json => (format_json_response(&result.rows), "application/json; charset=utf-8"),
        Accept::Csv => (format_csv_response(&result.rows), "text/csv; charset=utf-8"),
        Accept::SingleObject => {
            let body = format_singular_json(&result.rows)?;
            (body, "application/vnd.pgrst.object+json; charset=utf-8")
        }
    };

    let mut response = Response::new(result.status, body);
    response.set_content_type(content_type);
    if let Some(range) = &result.content_range {
        response.set_content_range(range);
    }
    if let Some(location) = &result.location {
        response.set_location(location);
    }
    Ok(response)
}

/// `Accept: application/vnd.pgrst.object+json` returns the first row as an
/// object iff exactly one row matched, else `406 PGRST116` (§4.5).
fn format_singular_json(rows: &[Record]) -> Result<bytes::Bytes, FormatError> {
    match rows {
        [single] => Ok(format_json_object(single)),
        _ => Err(FormatError::SingleRowViolation),
    }
}

/// CSV with alphabetically sorted headers (the union of every row's keys —
/// `Record` is a `BTreeMap` so this is naturally sorted), empty string for
/// null, JSON-encoded nested values, raw string otherwise (§4.5).
fn format_csv_response(rows: &[Record]) -> bytes::Bytes {
    if rows.is_empty() {
        return bytes::Bytes::new();
    }

    let mut header_set = std::collections::BTreeSet::new();
    for row in rows {
        header_set.extend(row.keys().cloned());
    }
    let headers: Vec<String> = header_set.into_iter().collect();

    let mut output = Vec::new();
    output.extend_from_slice(headers.iter().map(|h| csv_escape_field(h)).collect::<Vec<_>>().join(",").as_bytes());
    output.push(b'\n');

    for row in rows {
        let fields: Vec<String> = headers
            .iter()
            .map(|h| row.get(h).map(|v| csv_escape_field(&v.to_csv_field())).unwrap_or_default())
            .collect();
        output.extend_from_slice(fields.join(",").as_bytes());
        output.push(b'\n');
    }

    bytes::Bytes::from(output)
}

/// Quote a CSV field when it contains a comma, quote, or newline, doubling
/// any internal quotes.
fn csv_escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Response formatting error.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("multiple or zero rows returned for a single-object request")]
    SingleRowViolation,
}

impl FormatError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::SingleRowViolation => StatusCode::NOT_ACCEPTABLE,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({"error": "PGRST116", "message": self.to_string()})
    }
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
    fn json_accept_renders_array() {
        let result = QueryResult {
            status: StatusCode::OK,
            rows: vec![row(1, "Alice")],
            content_range: None,
            location: None,
        };
        let response = format_response(Accept::Json, &result).unwrap();
        assert_eq!(response.headers.get("content-type").unwrap(), "application/json; charset=utf-8");
        assert_eq!(&response.body[..], b"[{\"id\":1,\"name\":\"Alice\"}]");
    }

    #[test]
    fn single_object_with_exactly_one_row_succeeds() {
        let result = QueryResult {
            status: StatusCode::OK,
            rows: vec![row(1, "Alice")],
            content_range: None,
            location: None,
        };
        let response = format_response(Accept::SingleObject, &result).unwrap();
        assert_eq!(&response.body[..], b"{\"id\":1,\"name\":\"Alice\"}");
    }

    #[test]
    fn single_object_with_zero_rows_is_406() {
        let result = QueryResult {
            status: StatusCode::OK,
            rows: vec![],
            content_range: None,
            location: None,
        };
        let err = format_response(Accept::SingleObject, &result).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_ACCEPTABLE);
    }

    #[test]
    fn single_object_with_many_rows_is_406() {
        let result = QueryResult {
            status: StatusCode::OK,
            rows: vec![row(1, "Alice"), row(2, "Bob")],
            content_range: None,
            location: None,
        };
        let err = format_response(Accept::SingleObject, &result).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_ACCEPTABLE);
    }

    #[test]
    fn csv_headers_are_alphabetical() {
        let result = QueryResult {
            status: StatusCode::OK,
            rows: vec![row(1, "Alice")],
            content_range: None,
            location: None,
        };
        let response = format_response(Accept::Csv, &result).unwrap();
        let text = String::from_utf8(response.body.to_vec()).unwrap();
        assert_eq!(text.lines().next().unwrap(), "id,name");
    }

    #[test]
    fn csv_escapes_commas_and_quotes() {
        let mut r = Record::new();
        r.insert("note".into(), RecordValue::Text("a, \"quoted\" value".into()));
        let result = QueryResult {
            status: StatusCode::OK,
            rows: vec![r],
            content_range: None,
            location: None,
        };
        let response = format_response(Accept::Csv, &result).unwrap();
        let text = String::from_utf8(response.body.to_vec()).unwrap();
        assert_eq!(text, "note\n\"a, \"\"quoted\"\" value\"\n");
    }

    #[test]
    fn csv_null_renders_as_empty_field() {
        let mut r = Record::new();
        r.insert("maybe".into(), RecordValue::Null);
        let result = QueryResult {
            status: StatusCode::OK,
            rows: vec![r],
            content_range: None,
            location: None,
        };
        let response = format_response(Accept::Csv, &result).unwrap();
        let text = String::from_utf8(response.body.to_vec()).unwrap();
        assert_eq!(text, "maybe\n\n");
    }
}
