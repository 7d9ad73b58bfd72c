//! Application state.

use std::sync::Arc;

use sqlrest_auth::JwtConfig;
use sqlrest_core::{AppConfig, PermissiveRls, PragmaSchemaRegistry, RelationshipCache, RlsProvider, SchemaRegistry};
use sqlx::SqlitePool;

/// Shared application state. The relationship cache is the only mutable
/// shared state (§5); `schema_registry`/`rls` are swappable collaborators,
/// defaulted to the permissive/`PRAGMA`-backed implementations this crate
/// supplies so the binary runs out of the box.
pub struct AppState {
    /// Database connection pool.
    pub pool: SqlitePool,
    /// Lazily populated foreign-key relationship cache.
    pub relationships: RelationshipCache,
    /// Column-metadata collaborator, consulted by validation and the
    /// OpenAPI generator.
    pub schema_registry: Arc<dyn SchemaRegistry>,
    /// Row-level security collaborator.
    pub rls: Arc<dyn RlsProvider>,
    /// Application configuration.
    pub config: AppConfig,
    /// JWT configuration.
    pub jwt_config: JwtConfig,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig, jwt_config: JwtConfig) -> Self {
        let schema_registry = Arc::new(PragmaSchemaRegistry::new(pool.clone()));
        let relationships = RelationshipCache::new(pool.clone());
        Self {
            pool,
            relationships,
            schema_registry,
            rls: Arc::new(PermissiveRls),
            config,
            jwt_config,
        }
    }
}
