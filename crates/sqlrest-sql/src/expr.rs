//! SQL expression building.

use crate::{builder::SqlFragment, identifier::escape_ident, param::SqlParam};

/// A SQL expression (for WHERE clauses).
///
/// Comparison constructors come in matched positive/negated pairs rather
/// than a single constructor plus a generic [`Expr::not`] wrap. SQLite (like
/// Postgres) has no single negation operator that works uniformly across
/// `=`, `LIKE`, `IN` and `IS NULL` the way a bare `NOT (...)` implies;
/// writing `neq`/`not_like`/`not_in_list` directly keeps the emitted SQL
/// using the operator SQLite indexes on instead of an opaque `NOT` wrapper.
#[derive(Clone, Debug)]
pub struct Expr {
    fragment: SqlFragment,
}

impl Expr {
    /// Create an expression from a SQL fragment.
    pub fn from_fragment(fragment: SqlFragment) -> Self {
        Self { fragment }
    }

    /// Create a column reference expression.
    pub fn column(name: &str) -> Self {
        Self {
            fragment: SqlFragment::raw(escape_ident(name)),
        }
    }

    /// Create a qualified column reference (table.column).
    pub fn qualified_column(table: &str, column: &str) -> Self {
        Self {
            fragment: SqlFragment::raw(format!(
                "{}.{}",
                escape_ident(table),
                escape_ident(column)
            )),
        }
    }

    fn cmp(column: &str, op: &str, value: impl Into<SqlParam>) -> Self {
        let mut frag = SqlFragment::new();
        frag.push(&escape_ident(column));
        frag.push(" ");
        frag.push(op);
        frag.push(" ");
        frag.push_param(value);
        Self { fragment: frag }
    }

    /// `column = ?`
    pub fn eq(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "=", value)
    }

    /// `column <> ?` — the negation of [`Expr::eq`].
    pub fn neq(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "<>", value)
    }

    /// `column > ?`
    pub fn gt(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, ">", value)
    }

    /// `column <= ?` — the negation of [`Expr::gt`].
    pub fn not_gt(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "<=", value)
    }

    /// `column >= ?`
    pub fn gte(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, ">=", value)
    }

    /// `column < ?` — the negation of [`Expr::gte`].
    pub fn not_gte(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "<", value)
    }

    /// `column < ?`
    pub fn lt(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "<", value)
    }

    /// `column >= ?` — the negation of [`Expr::lt`].
    pub fn not_lt(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, ">=", value)
    }

    /// `column <= ?`
    pub fn lte(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "<=", value)
    }

    /// `column > ?` — the negation of [`Expr::lte`].
    pub fn not_lte(column: &str, value: impl Into<SqlParam>) -> Self {
        Self::cmp(column, ">", value)
    }

    /// `column LIKE ?`
    pub fn like(column: &str, pattern: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "LIKE", pattern)
    }

    /// `column NOT LIKE ?` — the negation of [`Expr::like`].
    pub fn not_like(column: &str, pattern: impl Into<SqlParam>) -> Self {
        Self::cmp(column, "NOT LIKE", pattern)
    }

    /// `column IS NULL`
    pub fn is_null(column: &str) -> Self {
        Self {
            fragment: SqlFragment::raw(format!("{} IS NULL", escape_ident(column))),
        }
    }

    /// `column IS NOT NULL` — the negation of [`Expr::is_null`].
    pub fn is_not_null(column: &str) -> Self {
        Self {
            fragment: SqlFragment::raw(format!("{} IS NOT NULL", escape_ident(column))),
        }
    }

    /// `column = ?` for a boolean value, or `column IS NULL` dispatch is
    /// left to the caller; this constructor exists for `is.true`/`is.false`.
    pub fn is_bool(column: &str, value: bool) -> Self {
        Self::cmp(column, "=", value)
    }

    /// `column IN (?, ?, ...)`. An empty list is unsatisfiable, so it
    /// compiles to `1 = 0` rather than relying on `FALSE`, which some
    /// older SQLite builds parse only as a column reference, not a literal.
    pub fn in_list(column: &str, values: Vec<SqlParam>) -> Self {
        if values.is_empty() {
            return Self {
                fragment: SqlFragment::raw("1 = 0"),
            };
        }

        let mut frag = SqlFragment::new();
        frag.push(&escape_ident(column));
        frag.push(" IN (");
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                frag.push(", ");
            }
            frag.push_param(value);
        }
        frag.push(")");
        Self { fragment: frag }
    }

    /// `column NOT IN (?, ?, ...)` — the negation of [`Expr::in_list`]. An
    /// empty list places no restriction on the result, so it compiles to
    /// `1 = 1` rather than `NOT IN ()`, which SQLite rejects as a syntax
    /// error.
    pub fn not_in_list(column: &str, values: Vec<SqlParam>) -> Self {
        if values.is_empty() {
            return Self {
                fragment: SqlFragment::raw("1 = 1"),
            };
        }

        let mut frag = SqlFragment::new();
        frag.push(&escape_ident(column));
        frag.push(" NOT IN (");
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                frag.push(", ");
            }
            frag.push_param(value);
        }
        frag.push(")");
        Self { fragment: frag }
    }

    /// Negate a composed expression (and/or groups, raw fragments) that has
    /// no direct negated form of its own: `NOT (expr)`.
    pub fn not(self) -> Self {
        let mut frag = SqlFragment::raw("NOT ");
        frag.append(self.fragment.parens());
        Self { fragment: frag }
    }

    /// Combine with AND: self AND other
    pub fn and(self, other: Expr) -> Self {
        let mut frag = self.fragment.parens();
        frag.push(" AND ");
        frag.append(other.fragment.parens());
        Self { fragment: frag }
    }

    /// Combine with OR: self OR other
    pub fn or(self, other: Expr) -> Self {
        let mut frag = self.fragment.parens();
        frag.push(" OR ");
        frag.append(other.fragment.parens());
        Self { fragment: frag }
    }

    /// Combine multiple expressions with AND. An empty set imposes no
    /// restriction, so it compiles to `1 = 1`.
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let frags: Vec<_> = exprs.into_iter().map(|e| e.fragment.parens()).collect();
        if frags.is_empty() {
            return Self {
                fragment: SqlFragment::raw("1 = 1"),
            };
        }
        Self {
            fragment: SqlFragment::join(" AND ", frags),
        }
    }

    /// Combine multiple expressions with OR. An empty set is unsatisfiable,
    /// so it compiles to `1 = 0`.
    pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Self {
        let frags: Vec<_> = exprs.into_iter().map(|e| e.fragment.parens()).collect();
        if frags.is_empty() {
            return Self {
                fragment: SqlFragment::raw("1 = 0"),
            };
        }
        Self {
            fragment: SqlFragment::join(" OR ", frags),
        }
    }

    /// Convert to a SQL fragment.
    pub fn into_fragment(self) -> SqlFragment {
        self.fragment
    }

    /// Get the SQL string.
    pub fn sql(&self) -> &str {
        self.fragment.sql()
    }

    /// Get the parameters.
    pub fn params(&self) -> &[SqlParam] {
        self.fragment.params()
    }
}

/// ORDER BY expression.
///
/// Null ordering is not exposed: there is no `nulls_first`/`nulls_last`
/// here, matching the grammar's plain `column.asc`/`column.desc`.
#[derive(Clone, Debug)]
pub struct OrderExpr {
    column: String,
    direction: Option<OrderDirection>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderExpr {
    /// Create a new ORDER BY expression.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: None,
        }
    }

    /// Set ascending order.
    pub fn asc(mut self) -> Self {
        self.direction = Some(OrderDirection::Asc);
        self
    }

    /// Set descending order.
    pub fn desc(mut self) -> Self {
        self.direction = Some(OrderDirection::Desc);
        self
    }

    /// Convert to SQL fragment.
    pub fn into_fragment(self) -> SqlFragment {
        let mut frag = SqlFragment::raw(escape_ident(&self.column));

        if let Some(dir) = self.direction {
            match dir {
                OrderDirection::Asc => frag.push(" ASC"),
                OrderDirection::Desc => frag.push(" DESC"),
            };
        }

        frag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_eq() {
        let expr = Expr::eq("name", "John");
        assert_eq!(expr.sql(), "\"name\" = ?");
        assert_eq!(expr.params().len(), 1);
    }

    #[test]
    fn test_expr_neq_is_not_generic_not() {
        let expr = Expr::neq("name", "John");
        assert_eq!(expr.sql(), "\"name\" <> ?");
        assert!(!expr.sql().starts_with("NOT"));
    }

    #[test]
    fn test_expr_negated_comparisons() {
        assert_eq!(Expr::not_gt("age", 5i64).sql(), "\"age\" <= ?");
        assert_eq!(Expr::not_gte("age", 5i64).sql(), "\"age\" < ?");
        assert_eq!(Expr::not_lt("age", 5i64).sql(), "\"age\" >= ?");
        assert_eq!(Expr::not_lte("age", 5i64).sql(), "\"age\" > ?");
        assert_eq!(Expr::not_like("name", "a%").sql(), "\"name\" NOT LIKE ?");
    }

    #[test]
    fn test_expr_in_list() {
        let expr = Expr::in_list(
            "id",
            vec![SqlParam::Int(1), SqlParam::Int(2), SqlParam::Int(3)],
        );
        assert_eq!(expr.sql(), "\"id\" IN (?, ?, ?)");
        assert_eq!(expr.params().len(), 3);
    }

    #[test]
    fn test_expr_in_list_empty() {
        let expr = Expr::in_list("id", vec![]);
        assert_eq!(expr.sql(), "1 = 0");
    }

    #[test]
    fn test_expr_not_in_list_empty() {
        let expr = Expr::not_in_list("id", vec![]);
        assert_eq!(expr.sql(), "1 = 1");
    }

    #[test]
    fn test_expr_is_null() {
        let expr = Expr::is_null("deleted_at");
        assert_eq!(expr.sql(), "\"deleted_at\" IS NULL");
    }

    #[test]
    fn test_expr_and() {
        let expr1 = Expr::eq("a", 1i64);
        let expr2 = Expr::eq("b", 2i64);
        let combined = expr1.and(expr2);

        assert!(combined.sql().contains(" AND "));
        assert_eq!(combined.params().len(), 2);
    }

    #[test]
    fn test_expr_or() {
        let expr1 = Expr::eq("a", 1i64);
        let expr2 = Expr::eq("b", 2i64);
        let combined = expr1.or(expr2);

        assert!(combined.sql().contains(" OR "));
    }

    #[test]
    fn test_expr_not_wraps_composed() {
        let expr = Expr::eq("a", 1i64).and(Expr::eq("b", 2i64)).not();
        assert!(expr.sql().starts_with("NOT"));
    }

    #[test]
    fn test_order_expr() {
        let order = OrderExpr::new("created_at").desc();
        let frag = order.into_fragment();
        assert_eq!(frag.sql(), "\"created_at\" DESC");
    }
}
