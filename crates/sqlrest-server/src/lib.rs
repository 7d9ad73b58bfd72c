//! sqlrest server library.
//!
//! This crate provides the HTTP server implementation for sqlrest.

pub mod admin;
pub mod app;
pub mod custom;
pub mod state;

pub use app::handle_request;
pub use state::AppState;

use std::sync::Arc;

use axum::{http::Method, routing::any, Router};
use tower_http::cors::{Any, CorsLayer};

/// Assemble the full router: health/readiness, live OpenAPI doc, and the
/// `/<table>` catch-all that drives the request orchestrator.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(custom::custom_router())
        .nest("/admin", admin::admin_router())
        .route("/", any(handle_request))
        .route("/{*path}", any(handle_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                    Method::HEAD,
                ])
                .allow_headers(Any)
                .expose_headers(Any),
        )
        .with_state(state)
}
