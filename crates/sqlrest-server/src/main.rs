//! sqlrest HTTP server binary.

use anyhow::Result;
use sqlrest_auth::JwtConfig;
use sqlrest_core::AppConfig;
use sqlrest_server::{build_router, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sqlrest=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting sqlrest server");
    info!("database: {}", mask_db_uri(&config.db_uri));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_pool_size)
        .connect(&config.db_uri)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    info!("connected to database");

    let jwt_config = JwtConfig {
        secret: config.jwt_secret.clone(),
        secret_is_base64: config.jwt_secret_is_base64,
        audience: config.jwt_aud.clone(),
        role_claim_key: config.jwt_role_claim_key.clone(),
        anon_role: config.anon_role.clone(),
    };

    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    let state = Arc::new(AppState::new(pool, config, jwt_config));
    let app = build_router(state);

    let addr = format!("{server_host}:{server_port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

fn mask_db_uri(uri: &str) -> String {
    if let Some(at_pos) = uri.find('@') {
        if let Some(proto_end) = uri.find("://") {
            return format!("{}://***@{}", &uri[..proto_end], &uri[at_pos + 1..]);
        }
    }
    uri.to_string()
}
