//! Error types for sqlrest.
//!
//! Every variant maps to an HTTP status code and renders as the two-field
//! `{error, message}` body the service returns on failure — no PostgREST-style
//! `code`/`details`/`hint` envelope, since there is no catalog of stable
//! machine-readable error codes behind it.

use http::StatusCode;
use thiserror::Error;

/// Result type for sqlrest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sqlrest.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Request parsing errors (400)
    // ========================================================================
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid query parameter: {0}")]
    InvalidQueryParam(String),

    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("update or delete requires at least one filter")]
    MissingFilter,

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    // ========================================================================
    // Authentication/authorization errors (401/403)
    // ========================================================================
    #[error("invalid JWT: {0}")]
    InvalidJwt(String),

    #[error("JWT expired")]
    JwtExpired,

    #[error("missing authentication")]
    MissingAuth,

    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    // ========================================================================
    // Resource errors (404/406)
    // ========================================================================
    #[error("table not found: {0}")]
    InvalidTable(String),

    #[error("relationship error: {0}")]
    RelationError(String),

    #[error("the request matched more or fewer rows than the single-row modifier allows")]
    SingleRowViolation,

    // ========================================================================
    // Query execution errors (500, unless the underlying cause is a 4xx)
    // ========================================================================
    #[error("query failed: {0}")]
    QueryError(String),

    #[error("insert failed: {0}")]
    InsertError(String),

    #[error("update failed: {0}")]
    UpdateError(String),

    #[error("delete failed: {0}")]
    DeleteError(String),

    #[error("count failed: {0}")]
    CountError(String),

    #[error("row scan failed: {0}")]
    ScanError(String),

    #[error("row-level security check failed: {0}")]
    RlsError(String),

    // ========================================================================
    // Internal errors (500)
    // ========================================================================
    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPath(_)
            | Self::InvalidQueryParam(_)
            | Self::InvalidHeader(_)
            | Self::InvalidJson(_)
            | Self::UnknownColumn(_)
            | Self::InvalidRange(_)
            | Self::MissingFilter
            | Self::ValidationFailed(_)
            | Self::RelationError(_) => StatusCode::BAD_REQUEST,

            Self::InvalidJwt(_) | Self::JwtExpired | Self::MissingAuth => {
                StatusCode::UNAUTHORIZED
            }

            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,

            Self::InvalidTable(_) => StatusCode::NOT_FOUND,

            Self::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,

            Self::SingleRowViolation => StatusCode::NOT_ACCEPTABLE,

            Self::QueryError(_)
            | Self::InsertError(_)
            | Self::UpdateError(_)
            | Self::DeleteError(_)
            | Self::CountError(_)
            | Self::ScanError(_)
            | Self::RlsError(_)
            | Self::Internal(_)
            | Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert to the `{error, message}` JSON response body.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.error_kind(),
            "message": self.to_string(),
        })
    }

    /// Short, stable kind string distinguishing the category of failure;
    /// not a per-variant code, just enough for a client to branch on.
    fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidPath(_) => "invalid_path",
            Self::InvalidQueryParam(_) => "invalid_query_param",
            Self::InvalidHeader(_) => "invalid_header",
            Self::InvalidJson(_) => "invalid_json",
            Self::UnsupportedMethod(_) => "unsupported_method",
            Self::UnknownColumn(_) => "unknown_column",
            Self::InvalidRange(_) => "invalid_range",
            Self::MissingFilter => "missing_filter",
            Self::ValidationFailed(_) => "validation_failed",
            Self::InvalidJwt(_) => "invalid_jwt",
            Self::JwtExpired => "jwt_expired",
            Self::MissingAuth => "missing_auth",
            Self::InsufficientPermissions(_) => "insufficient_permissions",
            Self::InvalidTable(_) => "invalid_table",
            Self::RelationError(_) => "relation_error",
            Self::SingleRowViolation => "single_row_violation",
            Self::QueryError(_) => "query_error",
            Self::InsertError(_) => "insert_error",
            Self::UpdateError(_) => "update_error",
            Self::DeleteError(_) => "delete_error",
            Self::CountError(_) => "count_error",
            Self::ScanError(_) => "scan_error",
            Self::RlsError(_) => "rls_error",
            Self::Internal(_) => "internal_error",
            Self::Config(_) => "config_error",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::QueryError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            Error::InvalidQueryParam("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::InvalidTable("widgets".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(Error::MissingFilter.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::SingleRowViolation.status_code(),
            StatusCode::NOT_ACCEPTABLE
        );
    }

    #[test]
    fn test_error_to_json_has_only_error_and_message() {
        let error = Error::InvalidQueryParam("bad filter".into());
        let json = error.to_json();
        assert_eq!(json["error"], "invalid_query_param");
        assert!(json["message"].as_str().unwrap().contains("bad filter"));
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
