//! UPDATE statement builder.

use crate::{builder::SqlFragment, expr::Expr, identifier::escape_ident, param::SqlParam};

/// Builder for UPDATE statements.
///
/// SET pairs are pushed before WHERE clauses so [`SqlFragment::params`]
/// comes back with SET args preceding WHERE args, matching the order the
/// orchestrator binds them in.
#[derive(Clone, Debug, Default)]
pub struct UpdateBuilder {
    table: Option<SqlFragment>,
    set: Vec<(String, SqlFragment)>,
    where_clauses: Vec<SqlFragment>,
    returning: Vec<SqlFragment>,
}

impl UpdateBuilder {
    /// Create a new UPDATE builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target table.
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(SqlFragment::raw(escape_ident(table)));
        self
    }

    /// Add a SET clause with a parameterized value.
    pub fn set(mut self, column: &str, value: impl Into<SqlParam>) -> Self {
        let mut frag = SqlFragment::new();
        frag.push_param(value);
        self.set.push((column.to_string(), frag));
        self
    }

    /// Add a SET clause with raw SQL.
    pub fn set_raw(mut self, column: &str, value: SqlFragment) -> Self {
        self.set.push((column.to_string(), value));
        self
    }

    /// Add a WHERE clause.
    pub fn where_expr(mut self, expr: Expr) -> Self {
        self.where_clauses.push(expr.into_fragment());
        self
    }

    /// Add a raw WHERE clause.
    pub fn where_raw(mut self, sql: SqlFragment) -> Self {
        self.where_clauses.push(sql);
        self
    }

    /// Add RETURNING clause.
    pub fn returning(mut self, column: &str) -> Self {
        self.returning
            .push(SqlFragment::raw(escape_ident(column)));
        self
    }

    /// Add RETURNING * clause.
    pub fn returning_all(mut self) -> Self {
        self.returning.push(SqlFragment::raw("*"));
        self
    }

    /// Build the UPDATE statement.
    pub fn build(self) -> SqlFragment {
        let mut result = SqlFragment::new();

        result.push("UPDATE ");

        if let Some(table) = self.table {
            result.append(table);
        }

        if !self.set.is_empty() {
            result.push(" SET ");
            for (i, (col, val)) in self.set.into_iter().enumerate() {
                if i > 0 {
                    result.push(",");
                }
                result.push(&escape_ident(&col));
                result.push("=");
                result.append(val);
            }
        }

        if !self.where_clauses.is_empty() {
            result.push(" WHERE ");
            for (i, clause) in self.where_clauses.into_iter().enumerate() {
                if i > 0 {
                    result.push(" AND ");
                }
                result.append(clause);
            }
        }

        if !self.returning.is_empty() {
            result.push(" RETURNING ");
            for (i, ret) in self.returning.into_iter().enumerate() {
                if i > 0 {
                    result.push(", ");
                }
                result.append(ret);
            }
        }

        result
    }
}
