//! Query planning: resolve a parsed request plus an RLS predicate into an
//! immutable [`Query`]/[`MutateQuery`] (§3, §4.5).
//!
//! These types are built per request and discarded once the builder has
//! consumed them — there is no plan cache, only the relationship cache
//! underneath it.

use sqlrest_sql::Expr;

use crate::api_request::{Filter, LogicalFilter, OrderBy, QueryParams, SelectItem};

/// An immutable, fully-resolved read query (§3). `limit = None` means no
/// `LIMIT` clause is emitted; `offset` is only meaningful (and only ever
/// emitted by the builder) alongside a `limit`.
#[derive(Clone, Debug)]
pub struct Query {
    pub table: String,
    pub select: Vec<SelectItem>,
    pub filters: Vec<Filter>,
    pub logical_filters: Vec<LogicalFilter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub rls_predicate: Option<Expr>,
}

impl Query {
    /// Resolve a parsed request's query parameters plus an optional RLS
    /// predicate into a `Query` for `table`.
    pub fn new(table: impl Into<String>, params: QueryParams, rls_predicate: Option<Expr>) -> Self {
        Self {
            table: table.into(),
            select: params.select,
            filters: params.filters,
            logical_filters: params.logical_filters,
            order: params.order,
            limit: params.limit,
            offset: params.offset,
            rls_predicate,
        }
    }

    /// Whether the select tree asks for at least one relation to be
    /// embedded — the executor's batching path only runs when this is true.
    pub fn has_relations(&self) -> bool {
        self.select.iter().any(|item| matches!(item, SelectItem::Relation(_)))
    }
}

/// An immutable mutate (INSERT/UPSERT/UPDATE/DELETE) query: the filtering
/// half of [`Query`] plus the conflict target for upserts. No select/order/
/// limit — UPDATE/DELETE require at least one filter, enforced by the
/// orchestrator before a `MutateQuery` is built, not by this type itself.
#[derive(Clone, Debug)]
pub struct MutateQuery {
    pub table: String,
    pub filters: Vec<Filter>,
    pub logical_filters: Vec<LogicalFilter>,
    pub rls_predicate: Option<Expr>,
    pub on_conflict: Option<Vec<String>>,
}

impl MutateQuery {
    pub fn new(table: impl Into<String>, params: QueryParams, rls_predicate: Option<Expr>) -> Self {
        Self {
            table: table.into(),
            filters: params.filters,
            logical_filters: params.logical_filters,
            rls_predicate,
            on_conflict: params.on_conflict,
        }
    }

    /// Whether at least one filter (column-local or related, top-level or
    /// inside a non-empty logical group) would restrict the statement.
    /// The orchestrator calls this before DELETE/UPDATE (§4.5): an RLS
    /// predicate alone does not satisfy the requirement.
    pub fn has_filter(&self) -> bool {
        !self.filters.is_empty() || self.logical_filters.iter().any(|g| !g.filters.is_empty())
    }
}
