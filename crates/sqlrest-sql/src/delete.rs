//! DELETE statement builder.

use crate::{builder::SqlFragment, expr::Expr, identifier::escape_ident};

/// Builder for DELETE statements.
///
/// No `USING` clause: deletes never join against another table here, the
/// orchestrator requires at least one filter and expresses it entirely as
/// a WHERE clause.
#[derive(Clone, Debug, Default)]
pub struct DeleteBuilder {
    table: Option<SqlFragment>,
    where_clauses: Vec<SqlFragment>,
    returning: Vec<SqlFragment>,
}

impl DeleteBuilder {
    /// Create a new DELETE builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target table.
    pub fn from_table(mut self, table: &str) -> Self {
        self.table = Some(SqlFragment::raw(escape_ident(table)));
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

    /// Build the DELETE statement.
    pub fn build(self) -> SqlFragment {
        let mut result = SqlFragment::new();

        result.push("DELETE FROM ");

        if let Some(table) = self.table {
            result.append(table);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_delete() {
        let sql = DeleteBuilder::new()
            .from_table("users")
            .where_expr(Expr::eq("id", 1i64))
            .build();

        assert!(sql.sql().contains("DELETE FROM"));
        assert!(sql.sql().contains("WHERE"));
        assert_eq!(sql.params().len(), 1);
    }

    #[test]
    fn test_delete_all() {
        let sql = DeleteBuilder::new().from_table("logs").build();

        assert_eq!(sql.sql(), "DELETE FROM \"logs\"");
        assert!(sql.params().is_empty());
    }

    #[test]
    fn test_delete_returning() {
        let sql = DeleteBuilder::new()
            .from_table("users")
            .where_expr(Expr::is_not_null("deleted_at"))
            .returning("id")
            .returning("email")
            .build();

        assert!(sql.sql().contains("RETURNING"));
    }
}
