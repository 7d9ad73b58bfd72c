//! Row-level security splicing points.
//!
//! Postgres has row security policies baked into the database (`SET ROLE`,
//! `SET request.jwt.claims`, GUCs read back by `USING`/`WITH CHECK` clauses).
//! SQLite has no such mechanism, so this crate exposes the decision point
//! directly: a [`RlsProvider`] is asked for an optional predicate fragment
//! per table and operation, and the query builder splices it straight into
//! the `WHERE` position.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use sqlrest_sql::expr::Expr;

/// Claims and role extracted from a verified JWT (or the anonymous default).
#[derive(Clone, Debug, Default)]
pub struct AuthContext {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub claims: HashMap<String, Value>,
}

impl AuthContext {
    pub fn anonymous(anon_role: impl Into<String>) -> Self {
        Self {
            user_id: None,
            email: None,
            role: anon_role.into(),
            claims: HashMap::new(),
        }
    }

    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }
}

/// The CRUD operation an RLS predicate is being requested for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RlsOp {
    Select,
    Insert,
    Update,
    Delete,
}

/// Supplies a per-table, per-operation row filter given the caller's
/// [`AuthContext`]. Returning `Ok(None)` means "no restriction"; the default
/// [`PermissiveRls`] always does this.
///
/// Implementations are synchronous (`Result`, not a future) because the
/// predicate is expected to be a pure function of claims already resolved
/// by JWT verification — no further I/O is needed to decide it.
pub trait RlsProvider: Send + Sync {
    fn predicate(&self, table: &str, op: RlsOp, auth: &AuthContext) -> Result<Option<Expr>>;
}

/// Default provider used when no row-level security has been configured:
/// every table and operation is unrestricted.
#[derive(Clone, Copy, Debug, Default)]
pub struct PermissiveRls;

impl RlsProvider for PermissiveRls {
    fn predicate(&self, _table: &str, _op: RlsOp, _auth: &AuthContext) -> Result<Option<Expr>> {
        Ok(None)
    }
}

/// Schema introspection is I/O-bound (reads `PRAGMA` output lazily), so this
/// collaborator trait is async, unlike [`RlsProvider`].
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>>;
    async fn list_tables(&self) -> Result<Vec<String>>;
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    pub declared_type: String,
    pub not_null: bool,
    pub has_default: bool,
    pub is_primary_key: bool,
}

/// A coarse classification of a SQLite declared type, used by validation
/// and the OpenAPI generator. SQLite's type affinity rules (§4.3) collapse
/// any declared type name to one of these five buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SemanticType {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

impl SemanticType {
    /// SQLite type affinity rules: a declared type containing "INT" is
    /// INTEGER; containing "CHAR"/"CLOB"/"TEXT" is TEXT; containing "BLOB"
    /// or empty is BLOB; containing "REAL"/"FLOA"/"DOUB" is REAL; anything
    /// else is NUMERIC.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.contains("BLOB") || upper.is_empty() {
            Self::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Numeric
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permissive_rls_never_restricts() {
        let rls = PermissiveRls;
        let auth = AuthContext::anonymous("anon");
        assert!(rls.predicate("todos", RlsOp::Select, &auth).unwrap().is_none());
    }

    #[test]
    fn type_affinity_matches_sqlite_rules() {
        assert_eq!(SemanticType::from_declared("INTEGER"), SemanticType::Integer);
        assert_eq!(SemanticType::from_declared("VARCHAR(255)"), SemanticType::Text);
        assert_eq!(SemanticType::from_declared(""), SemanticType::Blob);
        assert_eq!(SemanticType::from_declared("DOUBLE"), SemanticType::Real);
        assert_eq!(SemanticType::from_declared("DECIMAL(10,2)"), SemanticType::Numeric);
    }
}
