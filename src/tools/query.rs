//! Read query tool.
//!
//! This module implements the `run_read_query` MCP tool. The statement is
//! classified before anything touches the database; only authorized
//! statements reach a hardened read-only session.

use crate::config::ExecutionDefaults;
use crate::db::{QueryExecutor, with_readonly_session};
use crate::error::DbResult;
use crate::models::{ColumnMetadata, MAX_ROW_LIMIT, QueryRequest, QueryResult};
use crate::tools::sql_validator;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::info;

/// Input for the run_read_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReadQueryInput {
    /// A single read-only SQL statement (SELECT, VALUES, or WITH ... SELECT). Anything that could modify data is rejected.
    pub sql: String,
    /// Maximum rows to return. Default: 5000, max: 10000
    #[serde(default)]
    pub max_rows: Option<u32>,
    /// Statement timeout in milliseconds. Default: 10000, max: 300000
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Idle-in-transaction timeout in milliseconds. Default: server setting (5000), max: 300000
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
    /// If true, try to decode binary columns as UTF-8 text first (fallback to base64). Default: false
    #[serde(default)]
    pub decode_binary: bool,
}

impl From<ReadQueryInput> for QueryRequest {
    fn from(input: ReadQueryInput) -> Self {
        Self {
            sql: input.sql,
            max_rows: input.max_rows,
            timeout_ms: input.timeout_ms,
            idle_timeout_ms: input.idle_timeout_ms,
            decode_binary: input.decode_binary,
        }
    }
}

/// Output from the run_read_query tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct QueryOutput {
    /// Column metadata (name, type, nullable). Empty when no rows were returned.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnMetadataOutput>,
    /// Query result rows as key-value maps
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// True if more rows were available than the limit allowed
    pub truncated: bool,
    /// Number of rows returned
    pub row_count: usize,
    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
    /// Warning message if any issues occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ColumnMetadataOutput {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
}

impl From<ColumnMetadata> for ColumnMetadataOutput {
    fn from(meta: ColumnMetadata) -> Self {
        Self {
            name: meta.name,
            type_name: meta.type_name,
            nullable: meta.nullable,
        }
    }
}

impl QueryOutput {
    /// Create output from a query result and an optional warning.
    pub fn from_result_with_warning(result: QueryResult, warning: Option<String>) -> Self {
        Self {
            row_count: result.rows.len(),
            truncated: result.truncated,
            execution_time_ms: result.execution_time_ms,
            columns: result.columns.into_iter().map(Into::into).collect(),
            rows: result.rows,
            warning,
        }
    }
}

impl From<QueryResult> for QueryOutput {
    fn from(result: QueryResult) -> Self {
        Self::from_result_with_warning(result, None)
    }
}

fn limit_warning(request: &QueryRequest) -> Option<String> {
    let requested = request.max_rows?;
    request.exceeds_row_limit().then(|| {
        format!(
            "Requested max_rows {} exceeds maximum allowed ({}). Results capped to {} rows.",
            requested, MAX_ROW_LIMIT, MAX_ROW_LIMIT
        )
    })
}

/// Handler for read query execution.
pub struct QueryToolHandler {
    defaults: ExecutionDefaults,
    executor: QueryExecutor,
}

impl QueryToolHandler {
    /// Create a new query tool handler.
    pub fn new(defaults: ExecutionDefaults) -> Self {
        let executor = QueryExecutor::with_default_limit(defaults.max_rows);
        Self { defaults, executor }
    }

    /// Handle the run_read_query tool call.
    ///
    /// Classification happens first, so a rejected statement is reported as
    /// such even when no database is configured. Only one statement is run
    /// per call.
    pub async fn run_read_query(&self, input: ReadQueryInput) -> DbResult<QueryOutput> {
        sql_validator::ensure_read_only(&input.sql)?;
        sql_validator::ensure_single_statement(&input.sql)?;

        let request = QueryRequest::from(input);
        let warning = limit_warning(&request);
        let session = self.defaults.session_config_for(&request);
        let statement_timeout_ms = session.statement_timeout_ms();
        let executor = self.executor;

        let result = with_readonly_session(&session, move |conn| {
            Box::pin(async move { executor.execute_query(conn, &request).await })
        })
        .await
        .map_err(|e| e.with_timeout_limit(statement_timeout_ms))?;

        info!(
            row_count = result.rows.len(),
            truncated = result.truncated,
            execution_time_ms = result.execution_time_ms,
            "Query executed"
        );

        Ok(QueryOutput::from_result_with_warning(result, warning))
    }
}
