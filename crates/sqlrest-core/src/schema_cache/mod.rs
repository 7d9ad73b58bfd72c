//! Relationship introspection and caching over SQLite's `PRAGMA` surface (§4.3).

mod cache;
mod queries;
mod registry;
mod types;

pub use cache::RelationshipCache;
pub use registry::PragmaSchemaRegistry;
pub use types::{JunctionInfo, RelKind, Relationship};
