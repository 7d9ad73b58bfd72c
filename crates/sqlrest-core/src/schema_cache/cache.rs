//! The lazy, `RwLock`-guarded relationship cache (§4.3, §5).
//!
//! Deliberately not an eager, whole-schema loader: SQLite's `PRAGMA`
//! introspection is cheap per-table, so this cache populates one table's
//! relationships at a time, on first reference (§4.3: "On first reference
//! to `table`..."). `RwLock`-guarded map, `tracing`-instrumented async
//! population, typed accessors with hint disambiguation.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use sqlrest_sql::is_safe_table_name;

use super::queries;
use super::types::{JunctionInfo, RelKind, Relationship};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct RelationshipCache {
    inner: Arc<RwLock<HashMap<String, Vec<Relationship>>>>,
    pool: SqlitePool,
}

impl RelationshipCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            pool,
        }
    }

    /// All relationships (outbound many-to-one and inbound one-to-many)
    /// known for `table`, populating the cache entry on first access.
    pub async fn get_relationships(&self, table: &str) -> Result<Vec<Relationship>> {
        if let Some(rels) = self.inner.read().await.get(table) {
            return Ok(rels.clone());
        }

        let rels = self.populate(table).await?;

        let mut guard = self.inner.write().await;
        // Another task may have populated it while we were querying; last
        // writer wins, both results are equivalent.
        guard.insert(table.to_string(), rels.clone());
        Ok(rels)
    }

    /// Build (but do not insert) the relationship list for `table`: its own
    /// outbound FKs plus inbound FKs discovered by scanning every other
    /// user table (§4.3 steps 1-3). Never holds the write lock while
    /// issuing `PRAGMA` queries (§5).
    async fn populate(&self, table: &str) -> Result<Vec<Relationship>> {
        if !is_safe_table_name(table) {
            return Err(Error::InvalidTable(table.to_string()));
        }

        debug!(table, "populating relationship cache entry");

        let mut rels = Vec::new();

        for fk in queries::foreign_key_list(&self.pool, table).await? {
            rels.push(Relationship {
                name: table.to_string(),
                local_column: fk.local_column,
                foreign_table: fk.foreign_table,
                foreign_column: fk.foreign_column,
                kind: RelKind::ManyToOne,
            });
        }

        let peers = queries::list_user_tables(&self.pool).await?;
        for peer in peers {
            // A self-referencing table is scanned like any other peer: its
            // outbound FK (from step above) and the matching inbound edge
            // found here are both kept (§4.3: "self-references kept").
            match queries::foreign_key_list(&self.pool, &peer).await {
                Ok(fks) => {
                    for fk in fks {
                        if fk.foreign_table == table {
                            rels.push(Relationship {
                                name: peer.clone(),
                                local_column: fk.foreign_column,
                                foreign_table: peer.clone(),
                                foreign_column: fk.local_column,
                                kind: RelKind::OneToMany,
                            });
                        }
                    }
                }
                Err(e) => {
                    // §7: introspection failures on peer tables are
                    // non-fatal, the peer is skipped.
                    warn!(table = peer.as_str(), error = %e, "skipping peer table during reverse-relationship scan");
                }
            }
        }

        Ok(rels)
    }

    /// Resolve a relation reference (by foreign-table name, or by an
    /// explicit FK-column hint when a table has more than one FK to the
    /// same foreign table) (§4.3).
    pub async fn find_relationship(
        &self,
        table: &str,
        relation: &str,
        hint: Option<&str>,
    ) -> Result<Relationship> {
        let rels = self.get_relationships(table).await?;
        let candidates: Vec<&Relationship> = rels
            .iter()
            .filter(|r| r.foreign_table == relation || r.local_column == relation)
            .collect();

        if let Some(hint) = hint {
            return candidates
                .into_iter()
                .find(|r| r.local_column == hint || r.foreign_column == hint)
                .cloned()
                .ok_or_else(|| {
                    let available: Vec<&str> =
                        rels.iter().map(|r| r.local_column.as_str()).collect();
                    Error::RelationError(format!(
                        "no relationship from {table} to {relation} via hint {hint}; available: {}",
                        available.join(", ")
                    ))
                });
        }

        match candidates.len() {
            0 => Err(Error::RelationError(format!(
                "no relationship from {table} to {relation}"
            ))),
            1 => Ok(candidates[0].clone()),
            _ => {
                let available: Vec<&str> = candidates.iter().map(|r| r.local_column.as_str()).collect();
                Err(Error::RelationError(format!(
                    "ambiguous relationship from {table} to {relation}; disambiguate with a hint, one of: {}",
                    available.join(", ")
                )))
            }
        }
    }

    /// Find a junction table connecting `source` and `target`, if any
    /// (§4.3: "strict junction" — exactly two FKs to distinct tables, both
    /// FK columns part of the primary key).
    pub async fn find_junction(&self, source: &str, target: &str) -> Result<Option<JunctionInfo>> {
        for candidate in queries::list_user_tables(&self.pool).await? {
            let fks = match queries::foreign_key_list(&self.pool, &candidate).await {
                Ok(fks) => fks,
                Err(_) => continue,
            };
            if fks.len() != 2 {
                continue;
            }
            let targets: Vec<&str> = fks.iter().map(|fk| fk.foreign_table.as_str()).collect();
            if targets.iter().collect::<std::collections::HashSet<_>>().len() != 2 {
                continue; // both FKs point at the same table: not a junction between two distinct tables
            }

            let pk_columns: Vec<String> = queries::table_info(&self.pool, &candidate)
                .await?
                .into_iter()
                .filter(|c| c.is_primary_key)
                .map(|c| c.name)
                .collect();
            if !fks.iter().all(|fk| pk_columns.contains(&fk.local_column)) {
                continue;
            }

            let (src_fk, tgt_fk) = if fks[0].foreign_table == source && fks[1].foreign_table == target {
                (&fks[0], &fks[1])
            } else if fks[1].foreign_table == source && fks[0].foreign_table == target {
                (&fks[1], &fks[0])
            } else {
                continue;
            };

            return Ok(Some(JunctionInfo {
                junction_table: candidate,
                source_column: src_fk.local_column.clone(),
                source_ref: src_fk.foreign_column.clone(),
                target_column: tgt_fk.local_column.clone(),
                target_ref: tgt_fk.foreign_column.clone(),
            }));
        }
        Ok(None)
    }

    /// Evict one table's cached relationships, forcing re-`PRAGMA` on next
    /// access.
    pub async fn invalidate(&self, table: &str) {
        self.inner.write().await.remove(table);
    }

    /// Evict every cached entry.
    pub async fn invalidate_all(&self) {
        self.inner.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
        sqlx::query("CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE cities (id INTEGER PRIMARY KEY, name TEXT NOT NULL, \
             country_id INTEGER REFERENCES countries(id))",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn discovers_outbound_and_inbound_relationships() {
        let pool = seeded_pool().await;
        let cache = RelationshipCache::new(pool);

        let city_rels = cache.get_relationships("cities").await.unwrap();
        assert_eq!(city_rels.len(), 1);
        assert_eq!(city_rels[0].kind, RelKind::ManyToOne);
        assert_eq!(city_rels[0].foreign_table, "countries");

        let country_rels = cache.get_relationships("countries").await.unwrap();
        assert_eq!(country_rels.len(), 1);
        assert_eq!(country_rels[0].kind, RelKind::OneToMany);
        assert_eq!(country_rels[0].foreign_table, "cities");
    }

    #[tokio::test]
    async fn rejects_unsafe_table_names() {
        let pool = seeded_pool().await;
        let cache = RelationshipCache::new(pool);
        let err = cache.get_relationships("cities; DROP TABLE x").await.unwrap_err();
        assert!(matches!(err, Error::InvalidTable(_)));
    }

    #[tokio::test]
    async fn invalidate_forces_repopulation() {
        let pool = seeded_pool().await;
        let cache = RelationshipCache::new(pool);
        cache.get_relationships("cities").await.unwrap();
        cache.invalidate("cities").await;
        let rels = cache.get_relationships("cities").await.unwrap();
        assert_eq!(rels.len(), 1);
    }

    #[tokio::test]
    async fn find_relationship_resolves_by_foreign_table_name() {
        let pool = seeded_pool().await;
        let cache = RelationshipCache::new(pool);
        let rel = cache.find_relationship("cities", "countries", None).await.unwrap();
        assert_eq!(rel.foreign_table, "countries");
    }
}
