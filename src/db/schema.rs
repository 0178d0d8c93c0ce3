//! Schema introspection module.
//!
//! Fixed, parameterized catalog queries run on a connection the caller has
//! already hardened (see [`crate::db::session`]). Identifier columns from
//! `information_schema` are cast to `text` so they decode as `String`.

use crate::error::{DbError, DbResult};
use crate::models::{ColumnDefinition, TableSchema};
use sqlx::postgres::PgConnection;
use sqlx::Row;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List non-system schemas.
    pub async fn list_schemas(conn: &mut PgConnection) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_SCHEMAS)
            .fetch_all(&mut *conn)
            .await?;

        let schemas = rows
            .iter()
            .map(|row| row.try_get::<String, _>("schema_name"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = schemas.len(), "Listed PostgreSQL schemas");
        Ok(schemas)
    }

    /// List base tables in `schema`, ordered by name.
    pub async fn list_tables(conn: &mut PgConnection, schema: &str) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::LIST_TABLES)
            .bind(schema)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = tables.len(), schema = schema, "Listed PostgreSQL tables");
        Ok(tables)
    }

    /// Describe a table's columns in ordinal order.
    ///
    /// Returns a `Schema` error when the table has no visible columns, which
    /// covers both a missing table and one the role cannot see.
    pub async fn describe_table(
        conn: &mut PgConnection,
        schema: &str,
        table_name: &str,
    ) -> DbResult<TableSchema> {
        let rows = sqlx::query(queries::DESCRIBE_COLUMNS)
            .bind(schema)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        let columns = rows
            .iter()
            .map(|row| {
                let name: String = row.try_get("column_name")?;
                let data_type: String = row.try_get("data_type")?;
                let nullable: String = row.try_get("is_nullable")?;
                Ok(ColumnDefinition::new(name, data_type, nullable == "YES"))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        if columns.is_empty() {
            return Err(DbError::schema(
                format!("Table '{}.{}' not found", schema, table_name),
                format!("{}.{}", schema, table_name),
            ));
        }

        debug!(
            schema = schema,
            table = table_name,
            columns = columns.len(),
            "Described PostgreSQL table"
        );

        Ok(TableSchema {
            schema_name: schema.to_string(),
            table_name: table_name.to_string(),
            columns,
        })
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

pub(crate) mod queries {
    pub const LIST_SCHEMAS: &str = r#"
        SELECT nspname::text AS schema_name
        FROM pg_namespace
        WHERE nspname NOT IN ('pg_catalog', 'information_schema')
        ORDER BY 1
        "#;

    pub const LIST_TABLES: &str = r#"
        SELECT table_name::text AS table_name
        FROM information_schema.tables
        WHERE table_schema = $1 AND table_type = 'BASE TABLE'
        ORDER BY 1
        "#;

    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            is_nullable::text AS is_nullable
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position
        "#;
}
