//! Typed representation of a parsed request (§3, §4.1).

/// A leaf column reference, possibly reaching into a JSON document.
///
/// `base->k1->k2->>kN` parses to `column = base`, `json_path = [k1, k2, ..,
/// kN]`, `json_text = true` (the `->>` at the end requested text
/// extraction); an all-`->` chain leaves `json_text = false`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Field {
    pub column: String,
    pub json_path: Vec<String>,
    pub json_text: bool,
}

impl Field {
    pub fn simple(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            json_path: Vec::new(),
            json_text: false,
        }
    }

    pub fn has_json_path(&self) -> bool {
        !self.json_path.is_empty()
    }
}

/// The eight comparison operators the grammar recognises (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
}

impl FilterOp {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "like" => Self::Like,
            "ilike" => Self::Ilike,
            _ => return None,
        })
    }
}

/// The right-hand side of an `is.` filter: `null`, `true`, or `false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IsValue {
    Null,
    True,
    False,
}

/// What a filter compares the column against, once the operator token is
/// peeled off. `Op` covers the eight comparison operators; `Is`/`In` are
/// side-channel variants with their own value shapes (§4.1).
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    Op(FilterOp, String),
    Is(IsValue),
    In(Vec<String>),
}

/// One `column=operator.value` (or `rel.column=...`) filter.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: Field,
    pub related_table: Option<String>,
    pub negated: bool,
    pub operation: Operation,
}

impl Filter {
    pub fn is_related(&self) -> bool {
        self.related_table.is_some()
    }
}

/// `and`/`or` logical grouping (§4.1, §9: "always emitted parenthesised").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogicalFilter {
    pub op: LogicOp,
    pub filters: Vec<Filter>,
}

/// One `order=` term: `col.desc`/`col.asc`/`rel(col).desc` (§4.1).
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub desc: bool,
    pub related_table: Option<String>,
}

/// A node of the parsed `select=` tree: either a column leaf or a named
/// relation that recurses into its own select tree (§3, §9).
#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Column(SelectColumn),
    Relation(SelectRelation),
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct SelectColumn {
    pub name: String,
    pub alias: Option<String>,
    pub json_path: Vec<String>,
    pub json_text: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectRelation {
    pub name: String,
    pub alias: Option<String>,
    pub inner: bool,
    pub columns: Vec<SelectItem>,
}

/// Everything carried by the URL query string of one request, before it is
/// resolved against the relationship cache into a [`crate::plan::Query`].
#[derive(Clone, Debug, Default)]
pub struct QueryParams {
    pub select: Vec<SelectItem>,
    pub filters: Vec<Filter>,
    pub logical_filters: Vec<LogicalFilter>,
    pub order: Vec<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub on_conflict: Option<Vec<String>>,
}
