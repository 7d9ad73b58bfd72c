//! Input validation against registered column metadata (§4.6).
//!
//! When a [`SchemaRegistry`] reports a non-empty column set for the target
//! table, every insert/update row is checked before it reaches the query
//! builder. When no metadata is registered, validation is skipped entirely
//! — the database is the source of truth in that case.

use std::collections::BTreeMap;

use sqlrest_sql::SqlParam;

use crate::error::{Error, Result};
use crate::rls::{ColumnDescriptor, SchemaRegistry, SemanticType};

/// Validate `row` against `table`'s registered columns. Unknown columns are
/// passed through untouched (the database rejects them); a null value in a
/// non-nullable column, or a value that doesn't match the column's semantic
/// type, fails with `Error::ValidationFailed`.
pub async fn validate_row(
    table: &str,
    row: &BTreeMap<String, SqlParam>,
    registry: &dyn SchemaRegistry,
) -> Result<()> {
    let columns = registry.columns(table).await?;
    if columns.is_empty() {
        return Ok(());
    }

    let by_name: std::collections::HashMap<&str, &ColumnDescriptor> =
        columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for (name, value) in row {
        let Some(col) = by_name.get(name.as_str()) else {
            continue;
        };

        if matches!(value, SqlParam::Null) {
            if col.not_null && !col.has_default {
                return Err(Error::ValidationFailed(format!(
                    "column \"{name}\" is not nullable"
                )));
            }
            continue;
        }

        if !matches_semantic_type(col.semantic_type, value) {
            return Err(Error::ValidationFailed(format!(
                "column \"{name}\" does not match its declared type"
            )));
        }
    }

    Ok(())
}

/// Whether `value` is an acceptable runtime shape for `semantic_type`.
/// Text-affinity columns accept any scalar (SQLite stores it as text
/// regardless), since §4.6 calls out `uuid`/`timestamptz`/`jsonb`/`bytea`
/// as text-represented semantic types layered on top of SQLite's own
/// coarser type affinities.
fn matches_semantic_type(semantic_type: SemanticType, value: &SqlParam) -> bool {
    match semantic_type {
        SemanticType::Integer => matches!(value, SqlParam::Int(_) | SqlParam::Bool(_)),
        SemanticType::Real | SemanticType::Numeric => {
            matches!(value, SqlParam::Int(_) | SqlParam::Float(_))
        }
        SemanticType::Text | SemanticType::Blob => true,
    }
}
