//! Request orchestration (§4.5): parse URL/headers → authenticate → ask the
//! RLS collaborator for a predicate → build SQL → execute → format.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::Method,
    response::Response as AxumResponse,
};
use http::StatusCode;
use serde_json::Value as JsonValue;
use tracing::debug;

use sqlrest_auth::authenticate;
use sqlrest_core::api_request::{
    parse_accept_header, parse_prefer_header, parse_query_params, parse_range_header, Accept,
    Preferences, QueryParams, ResolutionPreference, ReturnPreference,
};
use sqlrest_core::plan::{MutateQuery, Query};
use sqlrest_core::query::{
    build_count, build_delete, build_insert, build_select, build_update, build_upsert, embed,
    run_query, run_statement,
};
use sqlrest_core::record::{Record, RecordValue};
use sqlrest_core::rls::{AuthContext, RlsOp, RlsProvider};
use sqlrest_core::validate_row;
use sqlrest_core::Error;
use sqlrest_sql::{SqlFragment, SqlParam};

use sqlrest_response::{format_response, ContentRange, FormatError, QueryResult, Response as PgrstResponse};

use crate::state::AppState;

/// Entry point wired into the router for every `/<table>` request.
pub async fn handle_request(State(state): State<Arc<AppState>>, request: Request) -> AxumResponse {
    let is_head = request.method() == Method::HEAD;
    match process_request(&state, request).await {
        Ok(response) => build_axum_response(response, is_head),
        Err(e) => error_response(&e),
    }
}

async fn process_request(state: &AppState, request: Request) -> Result<PgrstResponse, Error> {
    let method = request.method().clone();
    let table = extract_table(request.uri().path())?;
    let query_string = request.uri().query().unwrap_or("").to_string();
    let headers = request.headers().clone();

    let auth_header = headers.get(http::header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let auth_result =
        authenticate(auth_header, &state.jwt_config).map_err(|e| Error::InvalidJwt(e.to_string()))?;
    let auth = to_auth_context(&auth_result);

    let prefs = headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .map(parse_prefer_header)
        .unwrap_or_default();
    let accept = headers
        .get(http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(parse_accept_header)
        .unwrap_or(Accept::Json);
    let range = headers
        .get(http::header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header);

    let body = axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024)
        .await
        .map_err(|e| Error::InvalidJson(e.to_string()))?;

    let mut params = parse_query_params(&query_string)?;

    debug!(%table, %method, "dispatching request");

    let result = match method {
        Method::GET | Method::HEAD => {
            let range_applied = apply_range_header(&mut params, range);
            handle_select(state, &table, params, &auth, &prefs, range_applied).await?
        }
        Method::POST => handle_insert(state, &table, params, &auth, &prefs, &body).await?,
        Method::PATCH => handle_update(state, &table, params, &auth, &prefs, &body).await?,
        Method::DELETE => handle_delete(state, &table, params, &auth, &prefs).await?,
        other => return Err(Error::UnsupportedMethod(other.to_string())),
    };

    format_response(accept, &result).map_err(map_format_error)
}

/// `/<table>` only — no nested resource paths in this surface (§6).
///
/// `table` is validated here with the same `is_safe_table_name` check the
/// relationship cache applies before its own `PRAGMA` interpolation (§4.3):
/// this is the entry point every request path funnels through, including
/// the insert/update routes that reach `validate_row` → `PRAGMA
/// table_info` without ever touching the relationship cache, so the check
/// has to happen here too rather than only at that one call site.
fn extract_table(path: &str) -> Result<String, Error> {
    let mut segments = path.trim_matches('/').split('/').filter(|s| !s.is_empty());
    let table = segments.next().ok_or_else(|| Error::InvalidPath(path.to_string()))?;
    if segments.next().is_some() {
        return Err(Error::InvalidPath(path.to_string()));
    }
    if !sqlrest_sql::is_safe_table_name(table) {
        return Err(Error::InvalidTable(table.to_string()));
    }
    Ok(table.to_string())
}

fn to_auth_context(auth: &sqlrest_auth::AuthResult) -> AuthContext {
    let user_id = auth.get_claim("sub").and_then(|v| v.as_str()).map(String::from);
    let email = auth.get_claim("email").and_then(|v| v.as_str()).map(String::from);
    AuthContext {
        user_id,
        email,
        role: auth.role.clone(),
        claims: auth.claims.clone(),
    }
}

/// Apply `Range` only when neither `limit` nor `offset` was an explicit
/// query parameter (§4.5). Returns whether it was applied, since that
/// governs the 200-vs-206 decision later.
fn apply_range_header(params: &mut QueryParams, range: Option<sqlrest_core::api_request::RangeHeader>) -> bool {
    if params.limit.is_some() || params.offset.is_some() {
        return false;
    }
    match range {
        Some(r) => {
            params.limit = Some(r.limit);
            params.offset = Some(r.offset);
            true
        }
        None => false,
    }
}

async fn handle_select(
    state: &AppState,
    table: &str,
    params: QueryParams,
    auth: &AuthContext,
    prefs: &Preferences,
    range_applied: bool,
) -> Result<QueryResult, Error> {
    let rls_predicate = state.rls.predicate(table, RlsOp::Select, auth)?;
    let query = Query::new(table, params, rls_predicate);

    if prefs.explain {
        return build_explain_result(state, &query).await;
    }

    let rows = embed(&state.pool, &query, &state.relationships).await?;

    let total = if prefs.count.is_some() {
        let count_frag = build_count(&query, &state.relationships).await?;
        let count_rows = run_query(&state.pool, &count_frag).await?;
        count_rows.first().and_then(|r| r.values().next()).and_then(record_value_to_i64)
    } else {
        None
    };

    let offset = query.offset.unwrap_or(0);
    let content_range = ContentRange::from_pagination(offset, query.limit, rows.len() as i64, total);
    let status = if range_applied && query.limit == Some(rows.len() as i64) {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    Ok(QueryResult {
        status,
        rows,
        content_range: Some(content_range),
        location: None,
    })
}

/// `Prefer: explain[=true]` (§4.5): render the SQL that would have run, its
/// bound args, and `EXPLAIN QUERY PLAN`'s own rows — no real execution.
async fn build_explain_result(state: &AppState, query: &Query) -> Result<QueryResult, Error> {
    let frag = build_select(query, &state.relationships).await?;
    let explain_frag = SqlFragment::raw_with_params(
        format!("EXPLAIN QUERY PLAN {}", frag.sql()),
        frag.params().to_vec(),
    );
    let plan_rows = run_query(&state.pool, &explain_frag).await?;

    let mut record = Record::new();
    record.insert("sql".into(), RecordValue::Text(frag.sql().to_string()));
    record.insert(
        "args".into(),
        RecordValue::Array(frag.params().iter().map(sql_param_to_record_value).collect()),
    );
    record.insert(
        "plan".into(),
        RecordValue::Array(plan_rows.into_iter().map(RecordValue::Object).collect()),
    );

    Ok(QueryResult {
        status: StatusCode::OK,
        rows: vec![record],
        content_range: None,
        location: None,
    })
}

async fn handle_insert(
    state: &AppState,
    table: &str,
    mut params: QueryParams,
    auth: &AuthContext,
    prefs: &Preferences,
    body: &[u8],
) -> Result<QueryResult, Error> {
    let _ = state.rls.predicate(table, RlsOp::Insert, auth)?;
    params.on_conflict = prefs.on_conflict.clone();

    let payload: JsonValue = if body.is_empty() {
        JsonValue::Array(Vec::new())
    } else {
        serde_json::from_slice(body).map_err(|e| Error::InvalidJson(e.to_string()))?
    };
    let items: Vec<JsonValue> = match payload {
        JsonValue::Array(items) => items,
        obj @ JsonValue::Object(_) => vec![obj],
        _ => return Err(Error::InvalidJson("expected a JSON object or array of objects".into())),
    };

    let returning = prefs.return_pref == Some(ReturnPreference::Representation);
    let upsert = prefs.resolution.is_some();
    let ignore_duplicates = prefs.resolution == Some(ResolutionPreference::IgnoreDuplicates);
    let conflict_columns = params.on_conflict.clone().unwrap_or_else(|| vec!["id".to_string()]);

    let mut result_rows = Vec::new();
    for item in items {
        let row = json_object_to_row(&item)?;
        validate_row(table, &row, state.schema_registry.as_ref()).await?;

        let frag = if upsert {
            build_upsert(table, &row, &conflict_columns, ignore_duplicates, returning)
        } else {
            build_insert(table, &row, returning)
        };

        if returning {
            result_rows.extend(run_query(&state.pool, &frag).await?);
        } else {
            run_statement(&state.pool, &frag).await?;
        }
    }

    Ok(QueryResult {
        status: StatusCode::CREATED,
        rows: result_rows,
        content_range: None,
        location: None,
    })
}

async fn handle_update(
    state: &AppState,
    table: &str,
    params: QueryParams,
    auth: &AuthContext,
    prefs: &Preferences,
    body: &[u8],
) -> Result<QueryResult, Error> {
    let item: JsonValue = serde_json::from_slice(body).map_err(|e| Error::InvalidJson(e.to_string()))?;
    let row = json_object_to_row(&item)?;
    validate_row(table, &row, state.schema_registry.as_ref()).await?;

    let rls_predicate = state.rls.predicate(table, RlsOp::Update, auth)?;
    let mutate = MutateQuery::new(table, params, rls_predicate);
    if !mutate.has_filter() {
        return Err(Error::MissingFilter);
    }

    let returning = prefs.return_pref == Some(ReturnPreference::Representation);
    let frag = build_update(&mutate, &row, &state.relationships, returning).await?;

    let (rows, status) = if returning {
        (run_query(&state.pool, &frag).await?, StatusCode::OK)
    } else {
        run_statement(&state.pool, &frag).await?;
        (Vec::new(), StatusCode::NO_CONTENT)
    };

    Ok(QueryResult {
        status,
        rows,
        content_range: None,
        location: None,
    })
}

async fn handle_delete(
    state: &AppState,
    table: &str,
    params: QueryParams,
    auth: &AuthContext,
    prefs: &Preferences,
) -> Result<QueryResult, Error> {
    let rls_predicate = state.rls.predicate(table, RlsOp::Delete, auth)?;
    let mutate = MutateQuery::new(table, params, rls_predicate);

    let returning = prefs.return_pref == Some(ReturnPreference::Representation);
    let frag = build_delete(&mutate, &state.relationships, returning).await?;

    let (rows, status) = if returning {
        (run_query(&state.pool, &frag).await?, StatusCode::OK)
    } else {
        run_statement(&state.pool, &frag).await?;
        (Vec::new(), StatusCode::NO_CONTENT)
    };

    Ok(QueryResult {
        status,
        rows,
        content_range: None,
        location: None,
    })
}

fn json_object_to_row(value: &JsonValue) -> Result<BTreeMap<String, SqlParam>, Error> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::InvalidJson("expected a JSON object".into()))?;
    Ok(obj.iter().map(|(k, v)| (k.clone(), json_value_to_param(v))).collect())
}

fn json_value_to_param(value: &JsonValue) -> SqlParam {
    match value {
        JsonValue::Null => SqlParam::Null,
        JsonValue::Bool(b) => SqlParam::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlParam::Int(i)
            } else {
                SqlParam::Float(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => SqlParam::Text(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => SqlParam::Json(value.clone()),
    }
}

fn sql_param_to_record_value(param: &SqlParam) -> RecordValue {
    match param {
        SqlParam::Null => RecordValue::Null,
        SqlParam::Bool(b) => RecordValue::Bool(*b),
        SqlParam::Int(i) => RecordValue::Int(*i),
        SqlParam::Float(f) => RecordValue::Float(*f),
        SqlParam::Text(s) => RecordValue::Text(s.clone()),
        SqlParam::Bytes(b) => RecordValue::Bytes(b.clone()),
        SqlParam::Json(v) => RecordValue::Text(v.to_string()),
    }
}

fn record_value_to_i64(value: &RecordValue) -> Option<i64> {
    match value {
        RecordValue::Int(i) => Some(*i),
        RecordValue::Float(f) => Some(*f as i64),
        _ => None,
    }
}

fn map_format_error(e: FormatError) -> Error {
    match e {
        FormatError::SingleRowViolation => Error::SingleRowViolation,
    }
}

fn build_axum_response(response: PgrstResponse, is_head: bool) -> AxumResponse {
    let mut builder = AxumResponse::builder().status(response.status);
    for (key, value) in response.headers.iter() {
        builder = builder.header(key, value);
    }
    let body = if is_head { Body::empty() } else { Body::from(response.body) };
    builder.body(body).unwrap_or_else(|_| AxumResponse::new(Body::empty()))
}

fn error_response(error: &Error) -> AxumResponse {
    let body = serde_json::to_vec(&error.to_json()).unwrap_or_default();
    AxumResponse::builder()
        .status(error.status_code())
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| AxumResponse::new(Body::empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_table_accepts_plain_name() {
        assert_eq!(extract_table("/todos").unwrap(), "todos");
    }

    #[test]
    fn extract_table_rejects_nested_path() {
        assert!(matches!(extract_table("/todos/1"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn extract_table_rejects_unsafe_characters() {
        let err = extract_table("/todos; DROP TABLE users").unwrap_err();
        assert!(matches!(err, Error::InvalidTable(_)));
    }
}
