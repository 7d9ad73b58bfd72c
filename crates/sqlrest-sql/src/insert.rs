//! INSERT statement builder.

use crate::{builder::SqlFragment, identifier::escape_ident, param::SqlParam};

/// Builder for INSERT statements.
#[derive(Clone, Debug, Default)]
pub struct InsertBuilder {
    table: Option<SqlFragment>,
    columns: Vec<String>,
    values: Vec<Vec<SqlFragment>>,
    on_conflict: Option<OnConflict>,
    returning: Vec<SqlFragment>,
}

#[derive(Clone, Debug)]
pub enum OnConflict {
    DoNothing,
    DoUpdate {
        columns: Vec<String>,
        set: Vec<(String, SqlFragment)>,
    },
}

impl InsertBuilder {
    /// Create a new INSERT builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target table.
    pub fn into_table(mut self, table: &str) -> Self {
        self.table = Some(SqlFragment::raw(escape_ident(table)));
        self
    }

    /// Set the columns to insert.
    pub fn columns(mut self, cols: Vec<String>) -> Self {
        self.columns = cols;
        self
    }

    /// Add a row of values.
    pub fn values(mut self, vals: Vec<SqlParam>) -> Self {
        let row: Vec<SqlFragment> = vals
            .into_iter()
            .map(|v| {
                let mut frag = SqlFragment::new();
                frag.push_param(v);
                frag
            })
            .collect();
        self.values.push(row);
        self
    }

    /// Add a row of raw SQL values.
    pub fn values_raw(mut self, vals: Vec<SqlFragment>) -> Self {
        self.values.push(vals);
        self
    }

    /// Set ON CONFLICT DO NOTHING.
    pub fn on_conflict_do_nothing(mut self) -> Self {
        self.on_conflict = Some(OnConflict::DoNothing);
        self
    }

    /// Set ON CONFLICT (conflict_columns) DO UPDATE SET col = excluded.col
    /// for every insert column not in the conflict target.
    ///
    /// If every insert column is part of the conflict target, there is
    /// nothing left to update; SQLite still requires a non-empty SET list
    /// after `DO UPDATE`, so the first conflict column is reassigned to
    /// itself (`col = excluded.col`) as a no-op.
    pub fn on_conflict_do_update(mut self, conflict_columns: Vec<String>, all_columns: &[String]) -> Self {
        let mut set: Vec<(String, SqlFragment)> = all_columns
            .iter()
            .filter(|c| !conflict_columns.contains(c))
            .map(|c| {
                let mut frag = SqlFragment::new();
                frag.push(&format!("excluded.{}", escape_ident(c)));
                (c.clone(), frag)
            })
            .collect();

        if set.is_empty() {
            if let Some(first) = conflict_columns.first() {
                let mut frag = SqlFragment::new();
                frag.push(&format!("excluded.{}", escape_ident(first)));
                set.push((first.clone(), frag));
            }
        }

        self.on_conflict = Some(OnConflict::DoUpdate {
            columns: conflict_columns,
            set,
        });
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

    /// Build the INSERT statement.
    pub fn build(self) -> SqlFragment {
        let mut result = SqlFragment::new();

        result.push("INSERT INTO ");

        if let Some(table) = self.table {
            result.append(table);
        }

        if !self.columns.is_empty() {
            result.push(" (");
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    result.push(",");
                }
                result.push(&escape_ident(col));
            }
            result.push(")");
        }

        if !self.values.is_empty() {
            result.push(" VALUES ");
            for (i, row) in self.values.into_iter().enumerate() {
                if i > 0 {
                    result.push(", ");
                }
                result.push("(");
                for (j, val) in row.into_iter().enumerate() {
                    if j > 0 {
                        result.push(",");
                    }
                    result.append(val);
                }
                result.push(")");
            }
        } else {
            result.push(" DEFAULT VALUES");
        }

        if let Some(conflict) = self.on_conflict {
            match conflict {
                OnConflict::DoNothing => {
                    result.push(" ON CONFLICT DO NOTHING");
                }
                OnConflict::DoUpdate { columns, set } => {
                    result.push(" ON CONFLICT (");
                    for (i, col) in columns.iter().enumerate() {
                        if i > 0 {
                            result.push(", ");
                        }
                        result.push(&escape_ident(col));
                    }
                    result.push(") DO UPDATE SET ");
                    for (i, (col, val)) in set.into_iter().enumerate() {
                        if i > 0 {
                            result.push(", ");
                        }
                        result.push(&escape_ident(&col));
                        result.push("=");
                        result.append(val);
                    }
                }
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
