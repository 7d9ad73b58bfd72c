//! Safe SQL identifier handling.
//!
//! Every identifier that reaches a query string goes through
//! [`escape_ident`]; no identifier is ever interpolated unquoted.

/// Escape a SQL identifier (table name, column name, alias).
///
/// Wraps the identifier in double quotes and doubles any embedded
/// double quote.
///
/// ```
/// use sqlrest_sql::escape_ident;
///
/// assert_eq!(escape_ident("users"), "\"users\"");
/// assert_eq!(escape_ident("user\"name"), "\"user\"\"name\"");
/// assert_eq!(escape_ident("My Table"), "\"My Table\"");
/// ```
pub fn escape_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL string literal.
///
/// Only for constructs that cannot take a bound parameter (`PRAGMA`
/// statements take a bare identifier, not even a literal, but some
/// call sites build raw fragments around one). Prefer [`crate::SqlParam`]
/// wherever a placeholder is possible.
///
/// ```
/// use sqlrest_sql::quote_literal;
///
/// assert_eq!(quote_literal("hello"), "'hello'");
/// assert_eq!(quote_literal("it's"), "'it''s'");
/// ```
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Validate a table name before it is interpolated into a `PRAGMA`
/// statement, which accepts no bound parameters.
///
/// Matches `[A-Za-z0-9_]+`, additionally permitting non-ASCII alphabetic
/// characters (Unicode table names are legal SQLite identifiers). This is
/// deliberately narrower than general SQL identifier syntax: it exists
/// solely to block the one unparameterizable injection point in the
/// relationship cache, not to validate identifiers in general.
pub fn is_safe_table_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || (c.is_alphabetic() && !c.is_ascii()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_ident() {
        assert_eq!(escape_ident("users"), "\"users\"");
        assert_eq!(escape_ident("user_table"), "\"user_table\"");
        assert_eq!(escape_ident("user\"name"), "\"user\"\"name\"");
        assert_eq!(escape_ident("My Table"), "\"My Table\"");
        assert_eq!(escape_ident(""), "\"\"");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("hello"), "'hello'");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn test_is_safe_table_name() {
        assert!(is_safe_table_name("users"));
        assert!(is_safe_table_name("_private"));
        assert!(is_safe_table_name("user123"));
        assert!(is_safe_table_name("café"));

        assert!(!is_safe_table_name(""));
        assert!(!is_safe_table_name("my-table"));
        assert!(!is_safe_table_name("my table"));
        assert!(!is_safe_table_name("users; DROP TABLE users"));
        assert!(!is_safe_table_name("user$table"));
    }
}
