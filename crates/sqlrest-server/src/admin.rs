//! Live OpenAPI document endpoint (§4.7).
//!
//! Unlike a hand-annotated spec, this is generated from the database's own
//! schema on every request, so it never drifts from what the tables actually
//! look like.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use sqlrest_core::generate_openapi;

use crate::state::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new().route("/openapi.json", get(openapi_handler))
}

async fn openapi_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match generate_openapi(state.schema_registry.as_ref(), "").await {
        Ok(doc) => (StatusCode::OK, Json(doc)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": "internal_error", "message": e.to_string()})),
        )
            .into_response(),
    }
}
