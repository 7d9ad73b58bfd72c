//! Raw `PRAGMA`/`sqlite_master` introspection queries backing the
//! relationship cache and `SchemaRegistry` default implementation (§4.3, §4.7).
//!
//! `PRAGMA` statements do not accept bound parameters, so every caller here
//! MUST validate the table name with [`sqlrest_sql::is_safe_table_name`]
//! before interpolating it — the sole defence against injection through
//! this path (§4.3).

use sqlx::{Row, SqlitePool};

use crate::error::{Error, Result};
use crate::rls::{ColumnDescriptor, SemanticType};

/// One row of `PRAGMA foreign_key_list(<table>)`.
pub struct ForeignKeyRow {
    pub local_column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

/// Run `PRAGMA foreign_key_list` for `table`. Caller must have already
/// validated `table` via `is_safe_table_name`.
pub async fn foreign_key_list(pool: &SqlitePool, table: &str) -> Result<Vec<ForeignKeyRow>> {
    let sql = format!("PRAGMA foreign_key_list(\"{}\")", table);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::RelationError(e.to_string()))?;

    rows.into_iter()
        .map(|row| {
            Ok(ForeignKeyRow {
                local_column: row.try_get::<String, _>("from").map_err(|e| Error::RelationError(e.to_string()))?,
                foreign_table: row.try_get::<String, _>("table").map_err(|e| Error::RelationError(e.to_string()))?,
                foreign_column: row.try_get::<String, _>("to").map_err(|e| Error::RelationError(e.to_string()))?,
            })
        })
        .collect()
}

/// List user tables from `sqlite_master`, excluding SQLite's own internal
/// tables (§4.3: "skipping `sqlite_%`").
pub async fn list_user_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::RelationError(e.to_string()))?;

    rows.into_iter()
        .map(|row| row.try_get::<String, _>("name").map_err(|e| Error::RelationError(e.to_string())))
        .collect()
}

/// Same listing, but also excludes `auth_%` and `_%` tables (§4.7's OpenAPI
/// scope, narrower than the relationship cache's full enumeration).
pub async fn list_public_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' \
           AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
           AND name NOT LIKE 'auth\\_%' ESCAPE '\\' \
           AND name NOT LIKE '\\_%' ESCAPE '\\'",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::RelationError(e.to_string()))?;

    rows.into_iter()
        .map(|row| row.try_get::<String, _>("name").map_err(|e| Error::RelationError(e.to_string())))
        .collect()
}

/// One row of `PRAGMA table_info(<table>)`.
pub struct TableInfoRow {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub has_default: bool,
    pub is_primary_key: bool,
}

pub async fn table_info(pool: &SqlitePool, table: &str) -> Result<Vec<TableInfoRow>> {
    let sql = format!("PRAGMA table_info(\"{}\")", table);
    let rows = sqlx::query(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::RelationError(e.to_string()))?;

    rows.into_iter()
        .map(|row| {
            let dflt: Option<String> = row
                .try_get("dflt_value")
                .map_err(|e| Error::RelationError(e.to_string()))?;
            let notnull: i64 = row
                .try_get("notnull")
                .map_err(|e| Error::RelationError(e.to_string()))?;
            let pk: i64 = row.try_get("pk").map_err(|e| Error::RelationError(e.to_string()))?;
            Ok(TableInfoRow {
                name: row.try_get("name").map_err(|e| Error::RelationError(e.to_string()))?,
                declared_type: row.try_get("type").map_err(|e| Error::RelationError(e.to_string()))?,
                not_null: notnull != 0,
                has_default: dflt.is_some(),
                is_primary_key: pk != 0,
            })
        })
        .collect()
}

pub async fn column_descriptors(pool: &SqlitePool, table: &str) -> Result<Vec<ColumnDescriptor>> {
    let rows = table_info(pool, table).await?;
    Ok(rows
        .into_iter()
        .map(|r| ColumnDescriptor {
            semantic_type: SemanticType::from_declared(&r.declared_type),
            name: r.name,
            declared_type: r.declared_type,
            not_null: r.not_null,
            has_default: r.has_default,
            is_primary_key: r.is_primary_key,
        })
        .collect())
}
