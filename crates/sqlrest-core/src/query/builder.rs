//! SQL generation (§4.2): `Query`/`MutateQuery` → `(sql, args)`.
//!
//! All builders return a [`SqlFragment`] (SQL text plus its bound params in
//! left-to-right order, never rearranged). Columns in INSERT/UPSERT/UPDATE
//! are always serialised in ascending key order (§4.2, §8.2 determinism).

use std::collections::BTreeMap;

use sqlrest_sql::{escape_ident, Expr, InsertBuilder, SqlFragment, SqlParam, SelectBuilder, UpdateBuilder, DeleteBuilder};

use crate::api_request::{Filter, LogicOp, LogicalFilter, SelectColumn, SelectItem};
use crate::error::{Error, Result};
use crate::plan::{MutateQuery, Query};
use crate::schema_cache::{RelationshipCache, Relationship};

use super::filter_expr;

/// Compile one filter, local or related, into an [`Expr`]. Related filters
/// need a relationship lookup to build their `EXISTS (...)` subquery
/// (§4.1: "materialises as `EXISTS (SELECT 1 FROM "rel" WHERE "rel"."<fk>"
/// = "<main>"."<pk>" AND <inner>)`"), so this is async and fallible.
async fn compile_filter(main_table: &str, filter: &Filter, cache: &RelationshipCache) -> Result<Expr> {
    match &filter.related_table {
        None => Ok(filter_expr::build_filter_expr(filter)),
        Some(rel) => {
            let rel_info = cache.find_relationship(main_table, rel, None).await?;
            let inner = filter_expr::build_filter_expr(filter);

            let mut frag = SqlFragment::new();
            frag.push("EXISTS (SELECT 1 FROM ");
            frag.push(&escape_ident(rel));
            frag.push(" WHERE ");
            frag.push(&escape_ident(rel));
            frag.push(".");
            frag.push(&escape_ident(&rel_info.foreign_column));
            frag.push(" = ");
            frag.push(&escape_ident(main_table));
            frag.push(".");
            frag.push(&escape_ident(&rel_info.local_column));
            frag.push(" AND ");
            frag.append(inner.into_fragment());
            frag.push(")");
            Ok(Expr::from_fragment(frag))
        }
    }
}

/// Compile a logical group: each member filter (local or related) is
/// compiled, then combined with AND/OR and parenthesised as a unit. An
/// empty group contributes no SQL (§3, §4.1).
async fn compile_logical_filter(
    main_table: &str,
    group: &LogicalFilter,
    cache: &RelationshipCache,
) -> Result<Option<Expr>> {
    if group.filters.is_empty() {
        return Ok(None);
    }
    let mut exprs = Vec::with_capacity(group.filters.len());
    for f in &group.filters {
        exprs.push(compile_filter(main_table, f, cache).await?);
    }
    Ok(Some(match group.op {
        LogicOp::And => Expr::and_all(exprs),
        LogicOp::Or => Expr::or_all(exprs),
    }))
}

/// Assemble the WHERE predicate list shared by SELECT/COUNT/UPDATE/DELETE:
/// (1) column-local filters, (2) non-empty logical groups, (3) the RLS
/// predicate, in that order, all ultimately joined with AND (§4.2).
async fn compile_where(
    main_table: &str,
    filters: &[Filter],
    logical_filters: &[LogicalFilter],
    rls_predicate: Option<&Expr>,
    cache: &RelationshipCache,
) -> Result<Vec<Expr>> {
    let mut exprs = Vec::new();
    for f in filters {
        exprs.push(compile_filter(main_table, f, cache).await?);
    }
    for g in logical_filters {
        if let Some(expr) = compile_logical_filter(main_table, g, cache).await? {
            exprs.push(expr);
        }
    }
    if let Some(rls) = rls_predicate {
        exprs.push(rls.clone());
    }
    Ok(exprs)
}

/// Base (non-relation) select columns; `*` if the tree has none, matching
/// "cols default to `*`" (§4.2). Relation leaves are the embedding
/// executor's concern (§4.4), not this builder's.
pub(super) fn base_columns(select: &[SelectItem]) -> Vec<&SelectColumn> {
    select
        .iter()
        .filter_map(|item| match item {
            SelectItem::Column(c) => Some(c),
            SelectItem::Relation(_) => None,
        })
        .collect()
}

/// The FK/PK column on `table` needed to match children for one top-level
/// relation, and whether the user already asked for it explicitly — used
/// both to augment the projected column list (§4.4 step 2) and, after
/// embedding, to decide which of those columns to strip back out (§4.4
/// step 6).
pub(super) struct MatchColumn {
    pub name: String,
    pub user_requested: bool,
}

/// Resolve the match column for every top-level relation in `select`
/// against `table` (§4.4 steps 1-2). Relations sharing the same match
/// column (e.g. two relations traversing the same FK) are deduplicated.
pub(super) async fn relation_match_columns(
    table: &str,
    select: &[SelectItem],
    cache: &RelationshipCache,
) -> Result<Vec<MatchColumn>> {
    let base = base_columns(select);
    let wildcard = base.is_empty() || base.iter().any(|c| c.name == "*");
    let explicit: std::collections::HashSet<&str> = base.iter().map(|c| c.name.as_str()).collect();

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in select {
        if let SelectItem::Relation(rel) = item {
            let rel_info = cache.find_relationship(table, &rel.name, None).await?;
            if seen.insert(rel_info.local_column.clone()) {
                out.push(MatchColumn {
                    user_requested: wildcard || explicit.contains(rel_info.local_column.as_str()),
                    name: rel_info.local_column,
                });
            }
        }
    }
    Ok(out)
}

pub(super) fn apply_columns(mut builder: SelectBuilder, columns: &[&SelectColumn]) -> SelectBuilder {
    if columns.is_empty() || columns.iter().any(|c| c.name == "*") {
        return builder.all_columns();
    }
    for col in columns {
        let field = crate::api_request::Field {
            column: col.name.clone(),
            json_path: col.json_path.clone(),
            json_text: col.json_text,
        };
        let sql = filter_expr::column_sql(&field);
        let rendered = match &col.alias {
            Some(alias) => format!("{} AS {}", sql, escape_ident(alias)),
            None => sql,
        };
        builder = builder.column_raw(SqlFragment::raw(rendered));
    }
    builder
}

/// Related orderings needing a join, paired with whether the originating
/// select tree requested `!inner` on that same relation (§9 Open Question:
/// related ordering + `!inner` composes to an `INNER JOIN`).
fn relation_wants_inner(select: &[SelectItem], relation: &str) -> bool {
    select.iter().any(|item| match item {
        SelectItem::Relation(r) => r.name == relation && r.inner,
        SelectItem::Column(_) => false,
    })
}

async fn apply_relation_joins(
    mut builder: SelectBuilder,
    query: &Query,
    cache: &RelationshipCache,
) -> Result<(SelectBuilder, Vec<SqlFragment>)> {
    let mut order_fragments = Vec::new();
    let mut aliases: BTreeMap<String, String> = BTreeMap::new();

    for (i, ord) in query.order.iter().enumerate() {
        match &ord.related_table {
            None => {
                let mut frag = SqlFragment::raw(format!(
                    "{}.{}",
                    escape_ident(&query.table),
                    escape_ident(&ord.column)
                ));
                frag.push(if ord.desc { " DESC" } else { " ASC" });
                order_fragments.push(frag);
            }
            Some(rel) => {
                let alias = if let Some(existing) = aliases.get(rel) {
                    existing.clone()
                } else {
                    let alias = format!("_rel{i}");
                    let rel_info = cache.find_relationship(&query.table, rel, None).await?;
                    let condition = join_condition(&query.table, &alias, &rel_info);
                    let target = format!("{} AS {}", escape_ident(rel), escape_ident(&alias));
                    let kind = if relation_wants_inner(&query.select, rel) { "INNER" } else { "LEFT" };
                    builder = builder.join_raw(kind, &target, &condition);
                    aliases.insert(rel.clone(), alias.clone());
                    alias
                };
                let mut frag = SqlFragment::raw(format!("{}.{}", escape_ident(&alias), escape_ident(&ord.column)));
                frag.push(if ord.desc { " DESC" } else { " ASC" });
                order_fragments.push(frag);
            }
        }
    }

    Ok((builder, order_fragments))
}

fn join_condition(main_table: &str, alias: &str, rel_info: &Relationship) -> String {
    format!(
        "{}.{} = {}.{}",
        escape_ident(alias),
        escape_ident(&rel_info.foreign_column),
        escape_ident(main_table),
        escape_ident(&rel_info.local_column)
    )
}

/// `SELECT <cols> FROM "<table>" [joins] [WHERE …] [ORDER BY …] [LIMIT n
/// OFFSET m]` (§4.2). `limit = None`/`Some(0)` both suppress `LIMIT`;
/// `offset` is only emitted alongside a positive `limit`.
pub async fn build_select(query: &Query, cache: &RelationshipCache) -> Result<SqlFragment> {
    let mut builder = SelectBuilder::new();
    let cols = base_columns(&query.select);
    let wildcard = cols.is_empty() || cols.iter().any(|c| c.name == "*");
    builder = apply_columns(builder, &cols);

    // §4.4 step 2: a select tree with relations needs the parent-side FK/PK
    // column projected too, even when the user didn't ask for it, so the
    // embedding executor can match children back to their parent row.
    if query.has_relations() && !wildcard {
        for mc in relation_match_columns(&query.table, &query.select, cache).await? {
            if !cols.iter().any(|c| c.name == mc.name) {
                builder = builder.column_raw(SqlFragment::raw(escape_ident(&mc.name)));
            }
        }
    }

    builder = builder.from_table(&query.table);

    let (builder, order_fragments) = apply_relation_joins(builder, query, cache).await?;
    let mut builder = builder;

    let where_exprs = compile_where(
        &query.table,
        &query.filters,
        &query.logical_filters,
        query.rls_predicate.as_ref(),
        cache,
    )
    .await?;
    for expr in where_exprs {
        builder = builder.where_expr(expr);
    }

    for frag in order_fragments {
        builder = builder.order_by_raw(frag);
    }

    if let Some(limit) = query.limit {
        if limit > 0 {
            builder = builder.limit(limit);
            if let Some(offset) = query.offset {
                if offset > 0 {
                    builder = builder.offset(offset);
                }
            }
        }
    }

    Ok(builder.build())
}

/// `SELECT COUNT(*) FROM …` with identical WHERE assembly (§4.2).
pub async fn build_count(query: &Query, cache: &RelationshipCache) -> Result<SqlFragment> {
    let mut builder = SelectBuilder::new().column_raw(SqlFragment::raw("COUNT(*)")).from_table(&query.table);

    let where_exprs = compile_where(
        &query.table,
        &query.filters,
        &query.logical_filters,
        query.rls_predicate.as_ref(),
        cache,
    )
    .await?;
    for expr in where_exprs {
        builder = builder.where_expr(expr);
    }

    Ok(builder.build())
}

/// `INSERT INTO "<t>" ("c1",…) VALUES (?,…)` for one row, columns in
/// ascending key order (§4.2, §8.2).
pub fn build_insert(table: &str, row: &BTreeMap<String, SqlParam>, returning: bool) -> SqlFragment {
    let columns: Vec<String> = row.keys().cloned().collect();
    let values: Vec<SqlParam> = row.values().cloned().collect();

    let mut builder = InsertBuilder::new().into_table(table).columns(columns).values(values);
    if returning {
        builder = builder.returning_all();
    }
    builder.build()
}

/// `INSERT … ON CONFLICT ("k1",…) DO UPDATE SET "c"=excluded."c" …` (merge)
/// or `… DO NOTHING` (ignore), default conflict target `("id")` (§4.2).
pub fn build_upsert(
    table: &str,
    row: &BTreeMap<String, SqlParam>,
    conflict_columns: &[String],
    ignore_duplicates: bool,
    returning: bool,
) -> SqlFragment {
    let columns: Vec<String> = row.keys().cloned().collect();
    let values: Vec<SqlParam> = row.values().cloned().collect();

    let mut builder = InsertBuilder::new().into_table(table).columns(columns.clone()).values(values);
    builder = if ignore_duplicates {
        builder.on_conflict_do_nothing()
    } else {
        builder.on_conflict_do_update(conflict_columns.to_vec(), &columns)
    };
    if returning {
        builder = builder.returning_all();
    }
    builder.build()
}

/// `UPDATE "<t>" SET "c"=?,… WHERE <cond>`. SET args precede WHERE args in
/// the returned parameter vector (§4.2).
pub async fn build_update(
    query: &MutateQuery,
    row: &BTreeMap<String, SqlParam>,
    cache: &RelationshipCache,
    returning: bool,
) -> Result<SqlFragment> {
    let mut builder = UpdateBuilder::new().table(&query.table);
    for (col, val) in row {
        builder = builder.set(col, val.clone());
    }

    let where_exprs = compile_where(
        &query.table,
        &query.filters,
        &query.logical_filters,
        query.rls_predicate.as_ref(),
        cache,
    )
    .await?;
    for expr in where_exprs {
        builder = builder.where_expr(expr);
    }
    if returning {
        builder = builder.returning_all();
    }

    Ok(builder.build())
}

/// `DELETE FROM "<t>" WHERE <cond>`. The orchestrator is responsible for
/// requiring at least one filter before this is ever called (§4.2, §4.5).
pub async fn build_delete(query: &MutateQuery, cache: &RelationshipCache, returning: bool) -> Result<SqlFragment> {
    if !query.has_filter() {
        return Err(Error::MissingFilter);
    }

    let mut builder = DeleteBuilder::new().from_table(&query.table);
    let where_exprs = compile_where(
        &query.table,
        &query.filters,
        &query.logical_filters,
        query.rls_predicate.as_ref(),
        cache,
    )
    .await?;
    for expr in where_exprs {
        builder = builder.where_expr(expr);
    }
    if returning {
        builder = builder.returning_all();
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_request::{Field, FilterOp, Operation, OrderBy, QueryParams};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_cache() -> RelationshipCache {
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
        RelationshipCache::new(pool)
    }

    #[tokio::test]
    async fn select_defaults_to_wildcard_with_no_limit() {
        let cache = seeded_cache().await;
        let query = Query::new("countries", QueryParams::default(), None);
        let frag = build_select(&query, &cache).await.unwrap();
        assert_eq!(frag.sql(), "SELECT * FROM \"countries\"");
        assert!(frag.params().is_empty());
    }

    #[tokio::test]
    async fn select_applies_filters_limit_and_offset() {
        let cache = seeded_cache().await;
        let mut params = QueryParams::default();
        params.filters.push(Filter {
            field: Field::simple("name"),
            related_table: None,
            negated: false,
            operation: Operation::Op(FilterOp::Eq, "France".into()),
        });
        params.limit = Some(10);
        params.offset = Some(5);
        let query = Query::new("countries", params, None);
        let frag = build_select(&query, &cache).await.unwrap();
        assert_eq!(
            frag.sql(),
            "SELECT * FROM \"countries\" WHERE \"name\" = ? LIMIT 10 OFFSET 5"
        );
        assert_eq!(frag.params(), &[SqlParam::text("France")]);
    }

    #[tokio::test]
    async fn zero_limit_suppresses_limit_clause() {
        let cache = seeded_cache().await;
        let mut params = QueryParams::default();
        params.limit = Some(0);
        params.offset = Some(5);
        let query = Query::new("countries", params, None);
        let frag = build_select(&query, &cache).await.unwrap();
        assert_eq!(frag.sql(), "SELECT * FROM \"countries\"");
    }

    #[tokio::test]
    async fn related_filter_compiles_to_exists() {
        let cache = seeded_cache().await;
        let mut params = QueryParams::default();
        params.filters.push(Filter {
            field: Field::simple("name"),
            related_table: Some("cities".into()),
            negated: false,
            operation: Operation::Op(FilterOp::Eq, "Paris".into()),
        });
        let query = Query::new("countries", params, None);
        let frag = build_select(&query, &cache).await.unwrap();
        assert!(frag.sql().contains("EXISTS (SELECT 1 FROM \"cities\""));
        assert!(frag.sql().contains("\"cities\".\"country_id\" = \"countries\".\"id\""));
    }

    #[tokio::test]
    async fn related_order_introduces_left_join() {
        let cache = seeded_cache().await;
        let mut params = QueryParams::default();
        params.order.push(OrderBy {
            column: "name".into(),
            desc: false,
            related_table: Some("cities".into()),
        });
        let query = Query::new("countries", params, None);
        let frag = build_select(&query, &cache).await.unwrap();
        assert!(frag.sql().contains("LEFT JOIN"));
        assert!(frag.sql().contains("ORDER BY"));
    }

    #[tokio::test]
    async fn rls_predicate_is_anded_into_where() {
        let cache = seeded_cache().await;
        let query = Query::new("countries", QueryParams::default(), Some(Expr::eq("id", 1i64)));
        let frag = build_select(&query, &cache).await.unwrap();
        assert!(frag.sql().contains("WHERE"));
        assert_eq!(frag.params(), &[SqlParam::Int(1)]);
    }

    #[tokio::test]
    async fn delete_without_filter_is_rejected() {
        let cache = seeded_cache().await;
        let query = MutateQuery::new("countries", QueryParams::default(), None);
        let err = build_delete(&query, &cache, false).await.unwrap_err();
        assert!(matches!(err, Error::MissingFilter));
    }

    #[tokio::test]
    async fn delete_with_filter_builds_where() {
        let cache = seeded_cache().await;
        let mut params = QueryParams::default();
        params.filters.push(Filter {
            field: Field::simple("id"),
            related_table: None,
            negated: false,
            operation: Operation::Op(FilterOp::Eq, "1".into()),
        });
        let query = MutateQuery::new("countries", params, None);
        let frag = build_delete(&query, &cache, true).await.unwrap();
        assert_eq!(frag.sql(), "DELETE FROM \"countries\" WHERE \"id\" = ? RETURNING *");
    }

    #[test]
    fn insert_sorts_columns_ascending() {
        let mut row = BTreeMap::new();
        row.insert("name".to_string(), SqlParam::text("Acme"));
        row.insert("id".to_string(), SqlParam::Int(1));
        let frag = build_insert("widgets", &row, false);
        assert_eq!(
            frag.sql(),
            "INSERT INTO \"widgets\" (\"id\",\"name\") VALUES (?,?)"
        );
    }

    #[test]
    fn upsert_defaults_match_on_conflict_do_update() {
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), SqlParam::Int(1));
        row.insert("email".to_string(), SqlParam::text("a@b.com"));
        let frag = build_upsert("users", &row, &["id".to_string()], false, false);
        assert!(frag.sql().contains("ON CONFLICT (\"id\") DO UPDATE SET"));
    }

    #[test]
    fn upsert_ignore_duplicates_does_nothing() {
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), SqlParam::Int(1));
        let frag = build_upsert("users", &row, &["id".to_string()], true, false);
        assert!(frag.sql().contains("ON CONFLICT DO NOTHING"));
    }

    #[tokio::test]
    async fn update_set_args_precede_where_args() {
        let cache = seeded_cache().await;
        let mut row = BTreeMap::new();
        row.insert("name".to_string(), SqlParam::text("Gaul"));
        let mut params = QueryParams::default();
        params.filters.push(Filter {
            field: Field::simple("id"),
            related_table: None,
            negated: false,
            operation: Operation::Op(FilterOp::Eq, "1".into()),
        });
        let query = MutateQuery::new("countries", params, None);
        let frag = build_update(&query, &row, &cache, false).await.unwrap();
        assert_eq!(frag.params(), &[SqlParam::text("Gaul"), SqlParam::text("1")]);
    }
}
