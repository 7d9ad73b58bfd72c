//! Parsing of the restricted filter/select/order grammar (§4.1) out of a
//! decoded URL query string.
//!
//! A naive `take_until(")")` scan for a relation's embedded select list
//! breaks as soon as that list itself contains a nested relation
//! (`a(b(c))`): it stops at the *first* close-paren, not the one matching
//! the opening one. Every comma-list and paren-delimited body here is
//! split with [`split_top_level`], which tracks paren depth instead.

use super::types::*;
use crate::error::{Error, Result};

/// Reserved query parameter names that are never interpreted as a column
/// filter candidate (§4.1).
const RESERVED_PARAMS: &[&str] = &["select", "order", "limit", "offset", "or", "and", "match"];

/// Parse a fully decoded URL query string (already `&`-split key/value
/// pairs are not assumed; this takes the raw `a=b&c=d` string).
pub fn parse_query_params(query: &str) -> Result<QueryParams> {
    let mut params = QueryParams::default();
    if query.is_empty() {
        return Ok(params);
    }

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key);
        let value = percent_decode(raw_value);

        match key.as_str() {
            "select" => params.select = parse_select(&value)?,
            "order" => params.order = parse_order(&value)?,
            "limit" => {
                params.limit = Some(
                    value
                        .parse()
                        .map_err(|_| Error::InvalidQueryParam("limit".into()))?,
                )
            }
            "offset" => {
                params.offset = Some(
                    value
                        .parse()
                        .map_err(|_| Error::InvalidQueryParam("offset".into()))?,
                )
            }
            "and" | "or" => {
                // A malformed and=/or= group is a parse error the caller
                // swallows per filter (§7); other keys we simply skip.
                match parse_logical_group(&key, &value) {
                    Ok(group) => params.logical_filters.push(group),
                    Err(_) => continue,
                }
            }
            other => {
                if RESERVED_PARAMS.contains(&other) {
                    continue;
                }
                // §7: "parse errors for individual filters are swallowed".
                if let Some(filter) = parse_filter(&key, &value) {
                    params.filters.push(filter);
                }
            }
        }
    }

    Ok(params)
}

fn percent_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.replace('+', " "))
        .unwrap_or_else(|_| s.to_string())
}

// ============================================================================
// Paren-aware splitting
// ============================================================================

/// Split `s` on top-level occurrences of `sep`, never inside `(...)`.
/// Depth is tracked so `a.in.(1,2),b(c(d),e)` splits into exactly two items
/// even though both halves contain their own parenthesised bodies.
pub fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                out.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

/// Strip a single matching pair of outer parens, paren-aware (the body may
/// itself contain balanced parens at any depth).
fn strip_parens(s: &str) -> Option<&str> {
    let s = s.strip_prefix('(')?;
    let s = s.strip_suffix(')')?;
    Some(s)
}

// ============================================================================
// Filter parsing
// ============================================================================

/// `column=operator.value`, `rel.column=operator.value`, with optional
/// `not.` negation prefix. Returns `None` on any parse failure — the
/// caller drops the filter silently per §7.
fn parse_filter(key: &str, value: &str) -> Option<Filter> {
    let (related_table, field_str) = split_related(key);
    let field = parse_field_path(field_str);
    let (negated, operation) = parse_operation(value)?;

    Some(Filter {
        field,
        related_table,
        negated,
        operation,
    })
}

/// `rel.col` -> `(Some("rel"), "col")`; `col` -> `(None, "col")`.
fn split_related(key: &str) -> (Option<String>, &str) {
    match key.split_once('.') {
        Some((rel, rest)) if !rel.is_empty() && !rest.is_empty() => (Some(rel.to_string()), rest),
        _ => (None, key),
    }
}

/// Peel a `->`/`->>` JSON-path chain off a field reference. The `json_text`
/// flag reflects whichever arrow was used *last* in the chain (§4.1).
fn parse_field_path(s: &str) -> Field {
    let base_end = s.find("->").unwrap_or(s.len());
    let column = s[..base_end].to_string();
    let mut rest = &s[base_end..];
    let mut json_path = Vec::new();
    let mut json_text = false;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("->>") {
            let seg_end = tail.find("->").unwrap_or(tail.len());
            json_path.push(tail[..seg_end].to_string());
            json_text = true;
            rest = &tail[seg_end..];
        } else if let Some(tail) = rest.strip_prefix("->") {
            let seg_end = tail.find("->").unwrap_or(tail.len());
            json_path.push(tail[..seg_end].to_string());
            json_text = false;
            rest = &tail[seg_end..];
        } else {
            break;
        }
    }

    Field {
        column,
        json_path,
        json_text,
    }
}

/// `[not.]operator.value` -> `(negated, Operation)`.
fn parse_operation(value: &str) -> Option<(bool, Operation)> {
    let (negated, value) = match value.strip_prefix("not.") {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let (token, rest) = value.split_once('.')?;

    let operation = match token {
        "is" => Operation::Is(parse_is_value(rest)?),
        "in" => Operation::In(parse_in_list(rest)?),
        _ => Operation::Op(FilterOp::from_token(token)?, rest.to_string()),
    };

    Some((negated, operation))
}

fn parse_is_value(s: &str) -> Option<IsValue> {
    match s {
        "null" => Some(IsValue::Null),
        "true" => Some(IsValue::True),
        "false" => Some(IsValue::False),
        _ => None,
    }
}

/// `(a,b,"c,d")` -> `["a", "b", "c,d"]`. Values may be double-quoted to
/// embed a literal comma (§4.1).
fn parse_in_list(s: &str) -> Option<Vec<String>> {
    let body = strip_parens(s)?;
    if body.is_empty() {
        return Some(Vec::new());
    }
    Some(
        split_top_level(body, ',')
            .into_iter()
            .map(|item| {
                item.strip_prefix('"')
                    .and_then(|rest| rest.strip_suffix('"'))
                    .unwrap_or(item)
                    .to_string()
            })
            .collect(),
    )
}

// ============================================================================
// Logical group parsing (and=/or=)
// ============================================================================

/// `and=(a.eq.1,b.eq.2)` / `or=(...)`. An empty group parses to an empty
/// filter list, which the builder treats as contributing no SQL (§3).
fn parse_logical_group(key: &str, value: &str) -> Result<LogicalFilter> {
    let op = match key {
        "and" => LogicOp::And,
        "or" => LogicOp::Or,
        _ => return Err(Error::InvalidQueryParam(key.into())),
    };

    let body = strip_parens(value).ok_or_else(|| Error::InvalidQueryParam(value.into()))?;
    if body.is_empty() {
        return Ok(LogicalFilter {
            op,
            filters: Vec::new(),
        });
    }

    let filters = split_top_level(body, ',')
        .into_iter()
        .map(|item| {
            let (key, val) = item
                .split_once('.')
                .ok_or_else(|| Error::InvalidQueryParam(item.into()))?;
            parse_filter(key, val).ok_or_else(|| Error::InvalidQueryParam(item.into()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(LogicalFilter { op, filters })
}

// ============================================================================
// `match={...}` shorthand
// ============================================================================

/// JSON object shorthand: one `eq` filter per key, values stringified
/// (§4.1). Malformed JSON yields no filters (parse errors are swallowed).
pub fn parse_match(value: &str) -> Vec<Filter> {
    let parsed: serde_json::Value = match serde_json::from_str(value) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let Some(obj) = parsed.as_object() else {
        return Vec::new();
    };

    obj.iter()
        .map(|(k, v)| Filter {
            field: Field::simple(k.clone()),
            related_table: None,
            negated: false,
            operation: Operation::Op(FilterOp::Eq, stringify_match_value(v)),
        })
        .collect()
}

fn stringify_match_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Select parsing
// ============================================================================

/// `select=a,b:c->d,rel(e,f),alias:rel!inner(g)`.
pub fn parse_select(input: &str) -> Result<Vec<SelectItem>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(input, ',')
        .into_iter()
        .map(|item| parse_select_item(item.trim()))
        .collect()
}

fn parse_select_item(item: &str) -> Result<SelectItem> {
    let (alias, rest) = split_alias(item);

    if let Some(paren_idx) = rest.find('(') {
        if !rest.ends_with(')') {
            return Err(Error::InvalidQueryParam(item.into()));
        }
        let head = &rest[..paren_idx];
        let body = &rest[paren_idx + 1..rest.len() - 1];

        let (name, inner) = match head.split_once("!inner") {
            Some((name, "")) => (name, true),
            _ => (head, false),
        };
        if name.is_empty() {
            return Err(Error::InvalidQueryParam(item.into()));
        }

        let columns = parse_select(body)?;
        return Ok(SelectItem::Relation(SelectRelation {
            name: name.to_string(),
            alias,
            inner,
            columns,
        }));
    }

    if rest == "*" {
        return Ok(SelectItem::Column(SelectColumn {
            name: "*".to_string(),
            alias,
            json_path: Vec::new(),
            json_text: false,
        }));
    }

    let field = parse_field_path(rest);
    let computed_alias = alias.or_else(|| field.json_path.last().cloned());
    Ok(SelectItem::Column(SelectColumn {
        name: field.column,
        alias: computed_alias,
        json_path: field.json_path,
        json_text: field.json_text,
    }))
}

/// `alias:rest` -> `(Some(alias), rest)`, but only for a colon that occurs
/// before any parenthesis (a colon inside a nested select, e.g.
/// `rel(x:y)`, is handled by the recursive call, not here).
fn split_alias(item: &str) -> (Option<String>, &str) {
    let paren_idx = item.find('(').unwrap_or(item.len());
    match item[..paren_idx].find(':') {
        Some(colon_idx) => (
            Some(item[..colon_idx].to_string()),
            &item[colon_idx + 1..],
        ),
        None => (None, item),
    }
}

// ============================================================================
// Order parsing
// ============================================================================

/// `order=col.desc,rel(col2).asc` — no null-ordering tokens are recognised
/// (§9: "Null ordering is not exposed").
pub fn parse_order(input: &str) -> Result<Vec<OrderBy>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    split_top_level(input, ',')
        .into_iter()
        .map(|term| parse_order_term(term.trim()))
        .collect()
}

fn parse_order_term(term: &str) -> Result<OrderBy> {
    let mut parts = term.split('.');
    let head = parts.next().ok_or_else(|| Error::InvalidQueryParam(term.into()))?;
    let mut desc = false;
    for tok in parts {
        match tok {
            "asc" => desc = false,
            "desc" => desc = true,
            _ => {}
        }
    }

    let (related_table, column) = if let Some(body) = head.strip_suffix(')') {
        let open = body
            .find('(')
            .ok_or_else(|| Error::InvalidQueryParam(term.into()))?;
        (
            Some(body[..open].to_string()),
            body[open + 1..].to_string(),
        )
    } else {
        (None, head.to_string())
    };

    Ok(OrderBy {
        column,
        desc,
        related_table,
    })
}
