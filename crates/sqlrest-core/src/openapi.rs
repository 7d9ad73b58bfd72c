//! Live-schema OpenAPI generation (§4.7).
//!
//! Unlike a compile-time-annotated spec, this introspects whatever tables
//! and columns the configured [`SchemaRegistry`] currently reports, so the
//! document always matches the database it's served alongside.

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::rls::{ColumnDescriptor, SchemaRegistry, SemanticType};

/// Build the full OpenAPI 3.0 document for every table `registry` reports,
/// with paths mounted under `prefix` (e.g. `""` or `"/api"`).
pub async fn generate_openapi(registry: &dyn SchemaRegistry, prefix: &str) -> Result<Value> {
    let tables = registry.list_tables().await?;

    let mut schemas = Map::new();
    let mut paths = Map::new();

    for table in &tables {
        let columns = registry.columns(table).await?;
        schemas.insert(table.clone(), table_schema(&columns));
        paths.insert(format!("{prefix}/{table}"), table_path_item(table));
    }

    Ok(json!({
        "openapi": "3.0.3",
        "info": {
            "title": "sqlrest",
            "description": "Auto-generated API documentation",
            "version": "1.0.0",
        },
        "paths": Value::Object(paths),
        "components": {
            "schemas": Value::Object(schemas),
            "securitySchemes": {
                "bearerAuth": {
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT",
                },
                "apiKey": {
                    "type": "apiKey",
                    "in": "header",
                    "name": "apikey",
                },
            },
        },
        "security": [
            {"bearerAuth": []},
            {"apiKey": []},
        ],
    }))
}

/// JSON Schema object for one table, keyed by column name (§4.7).
fn table_schema(columns: &[ColumnDescriptor]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for col in columns {
        properties.insert(col.name.clone(), column_schema(col));
        if col.not_null && !col.has_default && !col.is_primary_key {
            required.push(Value::String(col.name.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": required,
    })
}

/// `{integer, number, boolean, string(+format), object}` per the
/// type-affinity → JSON-Schema mapping (§4.7), plus `nullable`.
fn column_schema(col: &ColumnDescriptor) -> Value {
    let declared = col.declared_type.to_ascii_uppercase();
    let nullable = !col.not_null && !col.is_primary_key;

    let mut schema = if declared.contains("BOOL") {
        json!({"type": "boolean"})
    } else if declared.contains("JSON") {
        json!({"type": "object"})
    } else {
        match col.semantic_type {
            SemanticType::Integer => json!({"type": "integer"}),
            SemanticType::Real | SemanticType::Numeric => json!({"type": "number", "format": "double"}),
            SemanticType::Blob => json!({"type": "string", "format": "binary"}),
            SemanticType::Text => string_schema(&declared),
        }
    };

    if nullable {
        if let Value::Object(map) = &mut schema {
            map.insert("nullable".to_string(), Value::Bool(true));
        }
    }
    schema
}

fn string_schema(declared: &str) -> Value {
    if declared.contains("UUID") {
        json!({"type": "string", "format": "uuid"})
    } else if declared.contains("DATETIME") || declared.contains("TIMESTAMP") {
        json!({"type": "string", "format": "date-time"})
    } else if declared.contains("DATE") {
        json!({"type": "string", "format": "date"})
    } else if declared.contains("TIME") {
        json!({"type": "string", "format": "time"})
    } else {
        json!({"type": "string"})
    }
}

/// `GET/POST/PATCH/DELETE /<prefix>/<table>` with the fixed parameter
/// templates every table endpoint shares (§4.7).
fn table_path_item(table: &str) -> Value {
    let query_params = json!([
        {"name": "select", "in": "query", "schema": {"type": "string"}, "description": "Columns and embedded relations to return"},
        {"name": "order", "in": "query", "schema": {"type": "string"}, "description": "Sort order, e.g. col.desc"},
        {"name": "limit", "in": "query", "schema": {"type": "integer"}},
        {"name": "offset", "in": "query", "schema": {"type": "integer"}},
    ]);

    let schema_ref = json!({"$ref": format!("#/components/schemas/{table}")});

    json!({
        "get": {
            "summary": format!("List {table}"),
            "operationId": format!("list_{table}"),
            "parameters": query_params,
            "responses": {
                "200": {
                    "description": "OK",
                    "content": {"application/json": {"schema": {"type": "array", "items": schema_ref}}},
                },
            },
        },
        "post": {
            "summary": format!("Create {table} row(s)"),
            "operationId": format!("create_{table}"),
            "requestBody": {
                "content": {
                    "application/json": {
                        "schema": {"oneOf": [schema_ref, {"type": "array", "items": schema_ref}]},
                    },
                },
            },
            "responses": {
                "201": {"description": "Created"},
            },
        },
        "patch": {
            "summary": format!("Update {table} rows"),
            "operationId": format!("update_{table}"),
            "parameters": query_params,
            "requestBody": {"content": {"application/json": {"schema": schema_ref}}},
            "responses": {
                "200": {"description": "OK"},
                "204": {"description": "No Content"},
            },
        },
        "delete": {
            "summary": format!("Delete {table} rows"),
            "operationId": format!("delete_{table}"),
            "parameters": query_params,
            "responses": {
                "200": {"description": "OK"},
                "204": {"description": "No Content"},
            },
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FakeRegistry;

    #[async_trait]
    impl SchemaRegistry for FakeRegistry {
        async fn columns(&self, _table: &str) -> Result<Vec<ColumnDescriptor>> {
            Ok(vec![
                ColumnDescriptor {
                    name: "id".into(),
                    semantic_type: SemanticType::Integer,
                    declared_type: "INTEGER".into(),
                    not_null: true,
                    has_default: false,
                    is_primary_key: true,
                },
                ColumnDescriptor {
                    name: "name".into(),
                    semantic_type: SemanticType::Text,
                    declared_type: "TEXT".into(),
                    not_null: true,
                    has_default: false,
                    is_primary_key: false,
                },
                ColumnDescriptor {
                    name: "done".into(),
                    semantic_type: SemanticType::Integer,
                    declared_type: "BOOLEAN".into(),
                    not_null: false,
                    has_default: true,
                    is_primary_key: false,
                },
            ])
        }
        async fn list_tables(&self) -> Result<Vec<String>> {
            Ok(vec!["todos".into()])
        }
    }

    #[tokio::test]
    async fn generates_path_and_schema_per_table() {
        let doc = generate_openapi(&FakeRegistry, "/api").await.unwrap();
        assert!(doc["paths"]["/api/todos"]["get"].is_object());
        assert!(doc["paths"]["/api/todos"]["post"].is_object());
        assert_eq!(doc["components"]["schemas"]["todos"]["properties"]["done"]["type"], "boolean");
        assert_eq!(doc["components"]["schemas"]["todos"]["required"], json!(["name"]));
        assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
    }

    #[tokio::test]
    async fn nullable_flag_set_for_optional_columns() {
        let doc = generate_openapi(&FakeRegistry, "").await.unwrap();
        assert_eq!(doc["components"]["schemas"]["todos"]["properties"]["done"]["nullable"], true);
        assert!(doc["components"]["schemas"]["todos"]["properties"]["id"].get("nullable").is_none());
    }
}
