//! Default [`SchemaRegistry`] backed directly by `PRAGMA table_info`,
//! mirroring what the relationship cache already does for FK edges.

use async_trait::async_trait;
use sqlx::SqlitePool;

use super::queries;
use crate::error::Result;
use crate::rls::{ColumnDescriptor, SchemaRegistry};

#[derive(Clone)]
pub struct PragmaSchemaRegistry {
    pool: SqlitePool,
}

impl PragmaSchemaRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaRegistry for PragmaSchemaRegistry {
    async fn columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        queries::column_descriptors(&self.pool, table).await
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        queries::list_public_tables(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn reports_columns_with_semantic_types() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE todos (id INTEGER PRIMARY KEY, task TEXT NOT NULL, done BOOLEAN DEFAULT 0)")
            .execute(&pool)
            .await
            .unwrap();

        let registry = PragmaSchemaRegistry::new(pool);
        let cols = registry.columns("todos").await.unwrap();
        assert_eq!(cols.len(), 3);
        assert!(cols.iter().any(|c| c.name == "task" && c.not_null));
        assert!(cols.iter().any(|c| c.name == "id" && c.is_primary_key));
    }
}
