//! Column-local filter compilation: [`Filter`] → [`Expr`] (§4.1, §4.2).
//!
//! Related-table filters (`rel.col=op.value`) are not handled here — they
//! need a relationship lookup to build their `EXISTS` subquery, and live in
//! [`super::builder`] instead. This module only ever sees the column-local
//! half of a filter.

use sqlrest_sql::{escape_ident, quote_literal, Expr, SqlFragment, SqlParam};

use crate::api_request::{Field, FilterOp, Filter, IsValue, Operation};

/// The SQL text referencing a field: a plain escaped identifier, or a
/// `json_extract(...)` call when the field carries a JSON path (§4.1).
/// `->>`-terminated paths are cast to text so comparisons behave like
/// PostgREST's text-extraction operator.
pub fn column_sql(field: &Field) -> String {
    if field.json_path.is_empty() {
        return escape_ident(&field.column);
    }

    let path = format!("$.{}", field.json_path.join("."));
    let extract = format!(
        "json_extract({}, {})",
        escape_ident(&field.column),
        quote_literal(&path)
    );

    if field.json_text {
        format!("CAST({} AS TEXT)", extract)
    } else {
        extract
    }
}

/// Coerce a raw filter operand. JSON-path (`->`, non-text) filters coerce
/// scalar literals to their native JSON type before binding; every other
/// filter (plain columns, and `->>` text extraction) binds the literal
/// string verbatim and lets SQLite's column-affinity conversion handle the
/// comparison (§4.1: "-> coerces scalar literals to native JSON types
/// before binding, ->> keeps text").
pub fn coerce_value(field: &Field, raw: &str) -> SqlParam {
    if field.has_json_path() && !field.json_text {
        return coerce_json_scalar(raw);
    }
    SqlParam::text(raw)
}

fn coerce_json_scalar(raw: &str) -> SqlParam {
    match raw {
        "true" => SqlParam::Bool(true),
        "false" => SqlParam::Bool(false),
        "null" => SqlParam::Null,
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                SqlParam::Int(i)
            } else if let Ok(f) = raw.parse::<f64>() {
                SqlParam::Float(f)
            } else {
                SqlParam::text(raw)
            }
        }
    }
}

fn cmp(column_sql: &str, op: &str, value: SqlParam) -> Expr {
    let mut frag = SqlFragment::new();
    frag.push(column_sql);
    frag.push(" ");
    frag.push(op);
    frag.push(" ");
    frag.push_param(value);
    Expr::from_fragment(frag)
}

fn like(column_sql: &str, op: &str, pattern: SqlParam) -> Expr {
    let mut frag = SqlFragment::new();
    frag.push(column_sql);
    frag.push(" ");
    frag.push(op);
    frag.push(" ");
    frag.push_param(pattern);
    Expr::from_fragment(frag)
}

fn ilike(column_sql: &str, op: &str, pattern: SqlParam) -> Expr {
    let mut frag = SqlFragment::new();
    frag.push("LOWER(");
    frag.push(column_sql);
    frag.push(") ");
    frag.push(op);
    frag.push(" LOWER(");
    frag.push_param(pattern);
    frag.push(")");
    Expr::from_fragment(frag)
}

fn in_list(column_sql: &str, op: &str, empty_sql: &str, values: Vec<SqlParam>) -> Expr {
    if values.is_empty() {
        return Expr::from_fragment(SqlFragment::raw(empty_sql));
    }
    let mut frag = SqlFragment::new();
    frag.push(column_sql);
    frag.push(" ");
    frag.push(op);
    frag.push(" (");
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            frag.push(", ");
        }
        frag.push_param(v);
    }
    frag.push(")");
    Expr::from_fragment(frag)
}

/// `*` (and literal `%`) is translated to SQL's `%` wildcard unconditionally
/// (§9 Open Question: "preserve this for compatibility", literal `*`
/// becomes unsearchable as a consequence).
fn translate_wildcard(pattern: &str) -> String {
    pattern.replace('*', "%")
}

/// Compile one column-local [`Filter`] into an [`Expr`], applying the
/// negation table (§4.1) by selecting the matched positive/negated
/// constructor pair rather than wrapping in a generic `NOT (...)`.
pub fn build_filter_expr(filter: &Filter) -> Expr {
    let col = column_sql(&filter.field);

    match (&filter.operation, filter.negated) {
        (Operation::Op(op, raw), negated) => {
            let value = coerce_value(&filter.field, raw);
            build_op_expr(&col, *op, value, negated, raw)
        }
        (Operation::Is(is_value), negated) => build_is_expr(&col, *is_value, negated),
        (Operation::In(values), negated) => {
            let params: Vec<SqlParam> = values.iter().map(|v| coerce_value(&filter.field, v)).collect();
            if negated {
                in_list(&col, "NOT IN", "1 = 1", params)
            } else {
                in_list(&col, "IN", "1 = 0", params)
            }
        }
    }
}

fn build_op_expr(col: &str, op: FilterOp, value: SqlParam, negated: bool, raw: &str) -> Expr {
    match (op, negated) {
        (FilterOp::Eq, false) => cmp(col, "=", value),
        (FilterOp::Eq, true) => cmp(col, "<>", value),
        (FilterOp::Neq, false) => cmp(col, "<>", value),
        (FilterOp::Neq, true) => cmp(col, "=", value),
        (FilterOp::Gt, false) => cmp(col, ">", value),
        (FilterOp::Gt, true) => cmp(col, "<=", value),
        (FilterOp::Gte, false) => cmp(col, ">=", value),
        (FilterOp::Gte, true) => cmp(col, "<", value),
        (FilterOp::Lt, false) => cmp(col, "<", value),
        (FilterOp::Lt, true) => cmp(col, ">=", value),
        (FilterOp::Lte, false) => cmp(col, "<=", value),
        (FilterOp::Lte, true) => cmp(col, ">", value),
        (FilterOp::Like, false) => like(col, "LIKE", SqlParam::text(translate_wildcard(raw))),
        (FilterOp::Like, true) => like(col, "NOT LIKE", SqlParam::text(translate_wildcard(raw))),
        (FilterOp::Ilike, false) => ilike(col, "LIKE", SqlParam::text(translate_wildcard(raw))),
        (FilterOp::Ilike, true) => ilike(col, "NOT LIKE", SqlParam::text(translate_wildcard(raw))),
    }
}

fn build_is_expr(col: &str, is_value: IsValue, negated: bool) -> Expr {
    match (is_value, negated) {
        (IsValue::Null, false) => Expr::from_fragment(SqlFragment::raw(format!("{col} IS NULL"))),
        (IsValue::Null, true) => Expr::from_fragment(SqlFragment::raw(format!("{col} IS NOT NULL"))),
        (IsValue::True, false) => cmp(col, "=", SqlParam::Bool(true)),
        (IsValue::True, true) => cmp(col, "<>", SqlParam::Bool(true)),
        (IsValue::False, false) => cmp(col, "=", SqlParam::Bool(false)),
        (IsValue::False, true) => cmp(col, "<>", SqlParam::Bool(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_request::{Field, Filter};

    fn filter(field: &str, op: FilterOp, value: &str, negated: bool) -> Filter {
        Filter {
            field: Field::simple(field),
            related_table: None,
            negated,
            operation: Operation::Op(op, value.to_string()),
        }
    }

    #[test]
    fn eq_filter_renders_param() {
        let f = filter("name", FilterOp::Eq, "John", false);
        let expr = build_filter_expr(&f);
        assert_eq!(expr.sql(), "\"name\" = ?");
        assert_eq!(expr.params(), &[SqlParam::text("John")]);
    }

    #[test]
    fn negated_eq_becomes_neq() {
        let f = filter("status", FilterOp::Eq, "active", true);
        let expr = build_filter_expr(&f);
        assert_eq!(expr.sql(), "\"status\" <> ?");
    }

    #[test]
    fn not_gt_becomes_lte() {
        let f = filter("age", FilterOp::Gt, "18", true);
        let expr = build_filter_expr(&f);
        assert_eq!(expr.sql(), "\"age\" <= ?");
    }

    #[test]
    fn like_translates_wildcard() {
        let f = filter("name", FilterOp::Like, "J*n", false);
        let expr = build_filter_expr(&f);
        assert_eq!(expr.params(), &[SqlParam::text("J%n")]);
    }

    #[test]
    fn ilike_lowercases_both_sides() {
        let f = filter("name", FilterOp::Ilike, "john", false);
        let expr = build_filter_expr(&f);
        assert_eq!(expr.sql(), "LOWER(\"name\") LIKE LOWER(?)");
    }

    #[test]
    fn empty_in_list_is_unsatisfiable() {
        let f = Filter {
            field: Field::simple("id"),
            related_table: None,
            negated: false,
            operation: Operation::In(vec![]),
        };
        assert_eq!(build_filter_expr(&f).sql(), "1 = 0");
    }

    #[test]
    fn empty_not_in_list_is_unrestricted() {
        let f = Filter {
            field: Field::simple("id"),
            related_table: None,
            negated: true,
            operation: Operation::In(vec![]),
        };
        assert_eq!(build_filter_expr(&f).sql(), "1 = 1");
    }

    #[test]
    fn json_path_filter_extracts_and_coerces() {
        let f = Filter {
            field: Field {
                column: "meta".into(),
                json_path: vec!["age".into()],
                json_text: false,
            },
            related_table: None,
            negated: false,
            operation: Operation::Op(FilterOp::Eq, "21".into()),
        };
        let expr = build_filter_expr(&f);
        assert!(expr.sql().starts_with("json_extract(\"meta\", '$.age') ="));
        assert_eq!(expr.params(), &[SqlParam::Int(21)]);
    }

    #[test]
    fn is_not_null_negation() {
        let f = Filter {
            field: Field::simple("deleted_at"),
            related_table: None,
            negated: true,
            operation: Operation::Is(IsValue::Null),
        };
        assert_eq!(build_filter_expr(&f).sql(), "\"deleted_at\" IS NOT NULL");
    }
}
