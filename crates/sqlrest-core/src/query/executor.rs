//! N+1-free relation-embedding executor (§4.4).
//!
//! The base query is built and run once (§4.2's builder, already augmented
//! with the FK/PK match columns a relation needs, see `builder::build_select`).
//! From there this module runs exactly one additional batched query per
//! top-level relation, indexes the results by the FK value, splices them
//! into the parent rows, then recurses into each relation's own nested
//! relations before returning — so an `R`-relation, `P`-row select tree
//! issues `1 + R` queries at this level regardless of `P` (§8 property 5).

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use sqlx::{Row, SqlitePool};

use sqlrest_sql::{escape_ident, SqlFragment, SqlParam};

use crate::api_request::{SelectColumn, SelectItem, SelectRelation};
use crate::error::{Error, Result};
use crate::plan::Query;
use crate::record::{column_name, value_from_sqlite, Record, RecordValue};
use crate::schema_cache::{RelKind, RelationshipCache};

use super::builder::{self, build_select};

/// Run `query` and, if its select tree asks for embedded relations, batch
/// in the children (§4.4). The single entry point the orchestrator calls
/// for every read.
pub async fn embed(pool: &SqlitePool, query: &Query, cache: &RelationshipCache) -> Result<Vec<Record>> {
    let sql = build_select(query, cache).await?;
    let rows = run_query(pool, &sql).await?;
    if rows.is_empty() || !query.has_relations() {
        return Ok(rows);
    }
    embed_relations(pool, query.table.clone(), query.select.clone(), rows, cache).await
}

/// Recurse one level of the select tree: embed every top-level relation in
/// `select` into `rows` (assumed already scanned from `table`), recursing
/// into each relation's own nested relations bottom-up first (§4.4 step 5).
fn embed_relations<'a>(
    pool: &'a SqlitePool,
    table: String,
    select: Vec<SelectItem>,
    rows: Vec<Record>,
    cache: &'a RelationshipCache,
) -> Pin<Box<dyn Future<Output = Result<Vec<Record>>> + Send + 'a>> {
    Box::pin(async move {
        let relations: Vec<&SelectRelation> = select
            .iter()
            .filter_map(|item| match item {
                SelectItem::Relation(rel) => Some(rel),
                SelectItem::Column(_) => None,
            })
            .collect();

        if relations.is_empty() {
            return Ok(rows);
        }

        let match_cols = builder::relation_match_columns(&table, &select, cache).await?;
        let mut rows = rows;

        for rel in &relations {
            rows = embed_one_relation(pool, &table, rel, rows, cache).await?;
        }

        // §4.4 step 6: drop FK/PK columns that were projected only to
        // enable matching and were never explicitly asked for.
        for mc in &match_cols {
            if !mc.user_requested {
                for row in rows.iter_mut() {
                    row.remove(&mc.name);
                }
            }
        }

        Ok(rows)
    })
}

/// Batch in one top-level relation: resolve its `Relationship`, run one
/// sub-query for all parent rows at once, recurse into the child rows' own
/// relations, then splice the result into each parent row (§4.4 steps 3-5).
async fn embed_one_relation(
    pool: &SqlitePool,
    table: &str,
    rel: &SelectRelation,
    rows: Vec<Record>,
    cache: &RelationshipCache,
) -> Result<Vec<Record>> {
    let rel_info = cache.find_relationship(table, &rel.name, None).await?;
    let key = rel.alias.clone().unwrap_or_else(|| rel.name.clone());

    let mut ids = Vec::new();
    let mut seen = HashSet::new();
    for row in &rows {
        if let Some(value) = row.get(&rel_info.local_column) {
            if !value.is_null() && seen.insert(value_key(value)) {
                ids.push(value_to_param(value));
            }
        }
    }

    let child_sql = build_child_select(&rel_info.foreign_table, &rel.columns, &rel_info.foreign_column, &ids, cache).await?;
    let child_rows = run_query(pool, &child_sql).await?;
    let child_rows = embed_relations(pool, rel_info.foreign_table.clone(), rel.columns.clone(), child_rows, cache).await?;

    let mut rows = rows;
    match rel_info.kind {
        RelKind::ManyToOne => {
            let mut index: HashMap<String, Record> = HashMap::new();
            for child in child_rows {
                if let Some(value) = child.get(&rel_info.foreign_column) {
                    index.entry(value_key(value)).or_insert(child);
                }
            }
            let mut kept = Vec::with_capacity(rows.len());
            for mut row in rows.drain(..) {
                let matched = row
                    .get(&rel_info.local_column)
                    .filter(|v| !v.is_null())
                    .and_then(|v| index.get(&value_key(v)))
                    .cloned();
                if rel.inner && matched.is_none() {
                    continue;
                }
                row.insert(key.clone(), matched.map(RecordValue::Object).unwrap_or(RecordValue::Null));
                kept.push(row);
            }
            rows = kept;
        }
        RelKind::OneToMany => {
            let mut groups: HashMap<String, Vec<Record>> = HashMap::new();
            for child in child_rows {
                if let Some(value) = child.get(&rel_info.foreign_column) {
                    groups.entry(value_key(value)).or_default().push(child);
                }
            }
            let mut kept = Vec::with_capacity(rows.len());
            for mut row in rows.drain(..) {
                let children = row
                    .get(&rel_info.local_column)
                    .filter(|v| !v.is_null())
                    .and_then(|v| groups.get(&value_key(v)))
                    .cloned()
                    .unwrap_or_default();
                if rel.inner && children.is_empty() {
                    continue;
                }
                row.insert(
                    key.clone(),
                    RecordValue::Array(children.into_iter().map(RecordValue::Object).collect()),
                );
                kept.push(row);
            }
            rows = kept;
        }
    }

    Ok(rows)
}

/// `SELECT <child cols + foreignColumn + nested match cols> FROM
/// "<foreignTable>" WHERE "<foreignColumn>" IN (?, …)` (§4.4 step 4). An
/// empty `ids` list is unsatisfiable by construction rather than an empty
/// `IN ()`, which SQLite would reject.
async fn build_child_select(
    foreign_table: &str,
    child_select: &[SelectItem],
    match_column: &str,
    ids: &[SqlParam],
    cache: &RelationshipCache,
) -> Result<SqlFragment> {
    let cols = builder::base_columns(child_select);
    let wildcard = cols.is_empty() || cols.iter().any(|c: &&SelectColumn| c.name == "*");
    let mut select_builder = builder::apply_columns(sqlrest_sql::SelectBuilder::new(), &cols);

    if !wildcard {
        if !cols.iter().any(|c| c.name == match_column) {
            select_builder = select_builder.column_raw(SqlFragment::raw(escape_ident(match_column)));
        }
        for mc in builder::relation_match_columns(foreign_table, child_select, cache).await? {
            if mc.name != match_column && !cols.iter().any(|c| c.name == mc.name) {
                select_builder = select_builder.column_raw(SqlFragment::raw(escape_ident(&mc.name)));
            }
        }
    }

    select_builder = select_builder.from_table(foreign_table);

    let mut where_frag = SqlFragment::new();
    if ids.is_empty() {
        where_frag.push("1 = 0");
    } else {
        where_frag.push(&escape_ident(match_column));
        where_frag.push(" IN (");
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                where_frag.push(", ");
            }
            where_frag.push_param(id.clone());
        }
        where_frag.push(")");
    }
    select_builder = select_builder.where_raw(where_frag);

    Ok(select_builder.build())
}

/// A hashable, type-tagged key for a [`RecordValue`], used to index/group
/// child rows by their FK value without requiring `Eq`/`Hash` on the enum
/// itself (it holds an `f64` variant).
fn value_key(value: &RecordValue) -> String {
    match value {
        RecordValue::Null => "n:".to_string(),
        RecordValue::Bool(b) => format!("b:{b}"),
        RecordValue::Int(i) => format!("i:{i}"),
        RecordValue::Float(f) => format!("f:{f}"),
        RecordValue::Text(s) => format!("t:{s}"),
        RecordValue::Bytes(b) => format!("y:{}", hex_encode(b)),
        RecordValue::Object(_) | RecordValue::Array(_) => String::new(),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn value_to_param(value: &RecordValue) -> SqlParam {
    match value {
        RecordValue::Null => SqlParam::Null,
        RecordValue::Bool(b) => SqlParam::Bool(*b),
        RecordValue::Int(i) => SqlParam::Int(*i),
        RecordValue::Float(f) => SqlParam::Float(*f),
        RecordValue::Text(s) => SqlParam::Text(s.clone()),
        RecordValue::Bytes(b) => SqlParam::Bytes(b.clone()),
        RecordValue::Object(_) | RecordValue::Array(_) => SqlParam::Null,
    }
}

/// Run a built [`SqlFragment`] as a query and scan every row into a
/// [`Record`] (§9: "generic row scanning"). Shared by the embedding
/// executor and the request orchestrator's read path.
pub async fn run_query(pool: &SqlitePool, frag: &SqlFragment) -> Result<Vec<Record>> {
    let mut q = sqlx::query(frag.sql());
    for param in frag.params() {
        q = bind_param(q, param);
    }
    let rows = q.fetch_all(pool).await.map_err(|e| Error::QueryError(e.to_string()))?;
    Ok(rows.iter().map(row_to_record).collect())
}

/// Run a built [`SqlFragment`] for its side effect (INSERT/UPDATE/DELETE
/// without `RETURNING`) and report the affected row count.
pub async fn run_statement(pool: &SqlitePool, frag: &SqlFragment) -> Result<u64> {
    let mut q = sqlx::query(frag.sql());
    for param in frag.params() {
        q = bind_param(q, param);
    }
    let result = q.execute(pool).await.map_err(|e| Error::QueryError(e.to_string()))?;
    Ok(result.rows_affected())
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Record {
    let mut record = Record::new();
    for idx in 0..row.len() {
        record.insert(column_name(row, idx), value_from_sqlite(row, idx));
    }
    record
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    param: &'q SqlParam,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match param {
        SqlParam::Null => query.bind(None::<i64>),
        SqlParam::Bool(b) => query.bind(*b),
        SqlParam::Int(i) => query.bind(*i),
        SqlParam::Float(f) => query.bind(*f),
        SqlParam::Text(s) => query.bind(s.as_str()),
        SqlParam::Bytes(b) => query.bind(b.as_slice()),
        SqlParam::Json(v) => query.bind(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_request::{QueryParams, SelectColumn, SelectRelation};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
        sqlx::query("CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE cities (id INTEGER PRIMARY KEY, name TEXT NOT NULL, \
             country_id INTEGER REFERENCES countries(id))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO countries (id, name) VALUES (1, 'Canada'), (2, 'France')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO cities (id, name, country_id) VALUES \
             (1, 'Toronto', 1), (2, 'Montreal', 1), (3, 'Paris', 2)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    fn select_with_relation(base: &str, relation: SelectRelation) -> Vec<SelectItem> {
        vec![
            SelectItem::Column(SelectColumn {
                name: base.to_string(),
                alias: None,
                json_path: vec![],
                json_text: false,
            }),
            SelectItem::Relation(relation),
        ]
    }

    #[tokio::test]
    async fn many_to_one_embeds_one_object_per_parent() {
        let pool = seeded_pool().await;
        let cache = RelationshipCache::new(pool.clone());
        let mut params = QueryParams::default();
        params.select = select_with_relation(
            "name",
            SelectRelation {
                name: "countries".into(),
                alias: None,
                inner: false,
                columns: vec![SelectItem::Column(SelectColumn {
                    name: "name".into(),
                    alias: None,
                    json_path: vec![],
                    json_text: false,
                })],
            },
        );
        let query = Query::new("cities", params, None);
        let rows = embed(&pool, &query, &cache).await.unwrap();

        assert_eq!(rows.len(), 3);
        let toronto = rows.iter().find(|r| r.get("name") == Some(&RecordValue::Text("Toronto".into()))).unwrap();
        match toronto.get("countries").unwrap() {
            RecordValue::Object(country) => {
                assert_eq!(country.get("name"), Some(&RecordValue::Text("Canada".into())));
            }
            other => panic!("expected object, got {other:?}"),
        }
        // FK column was injected only for matching, never asked for: stripped.
        assert!(toronto.get("country_id").is_none());
    }

    #[tokio::test]
    async fn one_to_many_returns_empty_array_not_null() {
        let pool = seeded_pool().await;
        sqlx::query("INSERT INTO countries (id, name) VALUES (3, 'Japan')")
            .execute(&pool)
            .await
            .unwrap();
        let cache = RelationshipCache::new(pool.clone());
        let mut params = QueryParams::default();
        params.select = select_with_relation(
            "name",
            SelectRelation {
                name: "cities".into(),
                alias: None,
                inner: false,
                columns: vec![SelectItem::Column(SelectColumn {
                    name: "name".into(),
                    alias: None,
                    json_path: vec![],
                    json_text: false,
                })],
            },
        );
        let query = Query::new("countries", params, None);
        let rows = embed(&pool, &query, &cache).await.unwrap();

        let japan = rows.iter().find(|r| r.get("name") == Some(&RecordValue::Text("Japan".into()))).unwrap();
        match japan.get("cities").unwrap() {
            RecordValue::Array(cities) => assert!(cities.is_empty()),
            other => panic!("expected array, got {other:?}"),
        }

        let canada = rows.iter().find(|r| r.get("name") == Some(&RecordValue::Text("Canada".into()))).unwrap();
        match canada.get("cities").unwrap() {
            RecordValue::Array(cities) => assert_eq!(cities.len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn inner_relation_drops_parents_with_empty_children() {
        let pool = seeded_pool().await;
        sqlx::query("INSERT INTO countries (id, name) VALUES (3, 'Japan')")
            .execute(&pool)
            .await
            .unwrap();
        let cache = RelationshipCache::new(pool.clone());
        let mut params = QueryParams::default();
        params.select = select_with_relation(
            "name",
            SelectRelation {
                name: "cities".into(),
                alias: None,
                inner: true,
                columns: vec![SelectItem::Column(SelectColumn {
                    name: "name".into(),
                    alias: None,
                    json_path: vec![],
                    json_text: false,
                })],
            },
        );
        let query = Query::new("countries", params, None);
        let rows = embed(&pool, &query, &cache).await.unwrap();

        assert!(rows.iter().all(|r| r.get("name") != Some(&RecordValue::Text("Japan".into()))));
    }

    #[tokio::test]
    async fn explicit_fk_column_selection_is_preserved() {
        let pool = seeded_pool().await;
        let cache = RelationshipCache::new(pool.clone());
        let mut params = QueryParams::default();
        params.select = vec![
            SelectItem::Column(SelectColumn {
                name: "name".into(),
                alias: None,
                json_path: vec![],
                json_text: false,
            }),
            SelectItem::Column(SelectColumn {
                name: "country_id".into(),
                alias: None,
                json_path: vec![],
                json_text: false,
            }),
            SelectItem::Relation(SelectRelation {
                name: "countries".into(),
                alias: None,
                inner: false,
                columns: vec![SelectItem::Column(SelectColumn {
                    name: "name".into(),
                    alias: None,
                    json_path: vec![],
                    json_text: false,
                })],
            }),
        ];
        let query = Query::new("cities", params, None);
        let rows = embed(&pool, &query, &cache).await.unwrap();
        assert!(rows.iter().all(|r| r.get("country_id").is_some()));
    }

    #[tokio::test]
    async fn no_n_plus_one_one_query_per_relation_level() {
        let pool = seeded_pool().await;
        let cache = RelationshipCache::new(pool.clone());
        let mut params = QueryParams::default();
        params.select = select_with_relation(
            "name",
            SelectRelation {
                name: "countries".into(),
                alias: None,
                inner: false,
                columns: vec![SelectItem::Column(SelectColumn {
                    name: "name".into(),
                    alias: None,
                    json_path: vec![],
                    json_text: false,
                })],
            },
        );
        let query = Query::new("cities", params, None);
        // Three parent rows (cities), one relation: must be exactly 2
        // queries total, not 1 + 3. There's no query counter exposed, so
        // this asserts the *shape* (every parent got the right child) as a
        // proxy — the implementation issues one batched child query by
        // construction (`build_child_select` runs once per relation).
        let rows = embed(&pool, &query, &cache).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.get("countries").is_some()));
    }
}
