//! sqlrest-core - a PostgREST-compatible REST API layer over an embedded
//! SQLite-shaped relational database.
//!
//! # Architecture
//!
//! The request processing pipeline:
//!
//! 1. **API Request Parsing** (`api_request`) - parse the URL query string
//!    and headers into domain types.
//! 2. **Schema Cache** (`schema_cache`) - foreign-key/column introspection,
//!    lazily populated per table.
//! 3. **Query Planning** (`plan`) - resolve a parsed request plus an RLS
//!    predicate into an immutable `Query`/`MutateQuery`.
//! 4. **SQL Generation & Execution** (`query`) - compile a plan to a
//!    parameterized `SqlFragment` and, for reads, batch in embedded
//!    relations without N+1 queries.
//! 5. **Row Representation** (`record`) - the dynamically typed row shape
//!    shared by the executor and the response formatter.
//!
//! # Example
//!
//! ```ignore
//! use sqlrest_core::{parse_query_params, plan::Query, query, schema_cache::RelationshipCache};
//!
//! let params = parse_query_params("select=name,cities(name)&name=eq.Canada")?;
//! let query = Query::new("countries", params, None);
//! let rows = query::embed(&pool, &query, &cache).await?;
//! ```

pub mod api_request;
pub mod config;
pub mod error;
pub mod plan;
pub mod query;
pub mod record;
pub mod rls;
pub mod schema_cache;
pub mod validation;
pub mod openapi;

pub use api_request::{
    parse_accept_header, parse_match, parse_prefer_header, parse_query_params, parse_range_header,
    parse_select, split_top_level, Accept, CountPreference, Field, Filter, FilterOp, IsValue,
    LogicOp, LogicalFilter, Operation, OrderBy, Preferences, QueryParams, RangeHeader,
    ResolutionPreference, ReturnPreference, SelectColumn, SelectItem, SelectRelation,
};
pub use config::{AppConfig, LogLevel};
pub use error::{Error, Result};
pub use plan::{MutateQuery, Query};
pub use query::{
    build_count, build_delete, build_insert, build_select, build_update, build_upsert, embed,
    run_query, run_statement,
};
pub use record::{column_name, record_to_json, value_from_sqlite, Record, RecordValue};
pub use rls::{
    AuthContext, ColumnDescriptor, PermissiveRls, RlsOp, RlsProvider, SchemaRegistry, SemanticType,
};
pub use schema_cache::{JunctionInfo, PragmaSchemaRegistry, RelKind, Relationship, RelationshipCache};
pub use validation::validate_row;
pub use openapi::generate_openapi;

/// Prelude for common imports.
pub mod prelude {
    pub use super::api_request::{
        parse_query_params, Accept, Filter, Preferences, QueryParams, SelectItem,
    };
    pub use super::config::AppConfig;
    pub use super::error::{Error, Result};
    pub use super::plan::{MutateQuery, Query};
    pub use super::query::embed;
    pub use super::record::{Record, RecordValue};
    pub use super::rls::{AuthContext, RlsProvider};
    pub use super::schema_cache::RelationshipCache;
}
