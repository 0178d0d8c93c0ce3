//! Schema introspection tools.
//!
//! This module implements the `list_schemas`, `list_tables` and
//! `describe_table` MCP tools. Each call opens its own hardened read-only
//! session, exactly like `run_read_query`.

use crate::config::ExecutionDefaults;
use crate::db::schema::SchemaInspector;
use crate::db::with_readonly_session;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDefinition, TableSchema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Output from the list_schemas tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListSchemasOutput {
    /// Non-system schemas, ordered by name
    pub schemas: Vec<String>,
    pub count: usize,
}

/// Input for the list_tables tool.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListTablesInput {
    /// Schema to list. Defaults to the server's configured schema (usually "public").
    #[serde(default, alias = "target_schema")]
    pub schema: Option<String>,
}

/// Output from the list_tables tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListTablesOutput {
    pub schema: String,
    /// Base tables, ordered by name
    pub tables: Vec<String>,
    pub count: usize,
}

/// Input for the describe_table tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DescribeTableInput {
    /// Schema containing the table. Defaults to the server's configured schema.
    #[serde(default, alias = "target_schema")]
    pub schema: Option<String>,
    /// Table name (unquoted, as stored in the catalog)
    #[serde(alias = "table_name")]
    pub table: String,
}

/// Output from the describe_table tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DescribeTableOutput {
    pub schema: String,
    pub table: String,
    /// Columns in ordinal order
    pub columns: Vec<ColumnOutput>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnOutput {
    pub name: String,
    /// Catalog type name (e.g., integer, character varying)
    pub data_type: String,
    pub nullable: bool,
}

impl From<ColumnDefinition> for ColumnOutput {
    fn from(col: ColumnDefinition) -> Self {
        Self {
            name: col.name,
            data_type: col.data_type,
            nullable: col.nullable,
        }
    }
}

impl From<TableSchema> for DescribeTableOutput {
    fn from(schema: TableSchema) -> Self {
        Self {
            schema: schema.schema_name,
            table: schema.table_name,
            columns: schema.columns.into_iter().map(Into::into).collect(),
        }
    }
}

pub struct SchemaToolHandler {
    defaults: ExecutionDefaults,
}

impl SchemaToolHandler {
    pub fn new(defaults: ExecutionDefaults) -> Self {
        Self { defaults }
    }

    pub async fn list_schemas(&self) -> DbResult<ListSchemasOutput> {
        let session = self.defaults.session_config(None);
        let schemas = with_readonly_session(&session, |conn| {
            Box::pin(SchemaInspector::list_schemas(conn))
        })
        .await?;
        let count = schemas.len();

        info!(count = count, "Listed schemas");

        Ok(ListSchemasOutput { schemas, count })
    }

    pub async fn list_tables(&self, input: ListTablesInput) -> DbResult<ListTablesOutput> {
        let schema = self.defaults.schema_or_default(input.schema.as_deref());
        let session = self.defaults.session_config(None);

        let target = schema.clone();
        let tables = with_readonly_session(&session, move |conn| {
            Box::pin(async move { SchemaInspector::list_tables(conn, &target).await })
        })
        .await?;
        let count = tables.len();

        info!(schema = %schema, count = count, "Listed tables");

        Ok(ListTablesOutput {
            schema,
            tables,
            count,
        })
    }

    pub async fn describe_table(&self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let table = input.table.trim().to_string();
        if table.is_empty() {
            return Err(DbError::invalid_input("table must not be empty"));
        }
        let schema = self.defaults.schema_or_default(input.schema.as_deref());
        let session = self.defaults.session_config(None);

        let described = with_readonly_session(&session, move |conn| {
            Box::pin(async move { SchemaInspector::describe_table(conn, &schema, &table).await })
        })
        .await?;

        info!(
            table = %described.qualified_name(),
            columns = described.columns.len(),
            "Described table"
        );

        Ok(described.into())
    }
}
