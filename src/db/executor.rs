//! Query execution engine.
//!
//! Runs one already-classified statement on a hardened session and bounds the
//! result:
//! - Row limits are enforced while streaming: at most `limit + 1` rows are
//!   pulled, the extra row only signals truncation
//! - Time limits are enforced by the engine through the session's
//!   `statement_timeout`; there is no client-side interruption
//!
//! Statements are sent without bind arguments, which sqlx runs over the simple
//! query protocol. Values therefore arrive in text format.

use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryRequest, QueryResult};
use futures_util::StreamExt;
use sqlx::postgres::{PgConnection, PgRow};
use std::time::Instant;
use tracing::{debug, warn};

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    default_limit: u32,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self {
            default_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Create a new query executor with a custom default row limit.
    pub fn with_default_limit(row_limit: u32) -> Self {
        Self {
            default_limit: row_limit.clamp(1, MAX_ROW_LIMIT),
        }
    }

    pub fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Execute a read query and return bounded results.
    pub async fn execute_query(
        &self,
        conn: &mut PgConnection,
        request: &QueryRequest,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let row_limit = request.effective_limit(self.default_limit);

        debug!(
            sql_len = request.sql.len(),
            limit = row_limit,
            "Executing read query"
        );

        let rows = fetch_bounded(conn, &request.sql, row_limit).await?;
        process_rows(rows, row_limit, start, request.decode_binary)
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream rows and stop after `row_limit + 1`.
pub async fn fetch_bounded(
    conn: &mut PgConnection,
    sql: &str,
    row_limit: u32,
) -> DbResult<Vec<PgRow>> {
    let fetch_limit = row_limit as usize + 1;
    let results = sqlx::Executor::fetch(&mut *conn, sql)
        .take(fetch_limit)
        .collect::<Vec<_>>()
        .await;
    collect_rows(results)
}

/// Convert fetched rows into a QueryResult, withholding anything past the limit.
fn process_rows<R: RowToJson>(
    rows: Vec<R>,
    row_limit: u32,
    start: Instant,
    decode_binary: bool,
) -> DbResult<QueryResult> {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    if rows.is_empty() {
        return Ok(QueryResult::empty(execution_time_ms));
    }

    let columns = rows[0].get_column_metadata();
    let total_rows = rows.len();
    let truncated = total_rows > row_limit as usize;
    let rows_to_take = (row_limit as usize).min(total_rows);

    let json_rows: Vec<serde_json::Map<String, serde_json::Value>> = rows
        .iter()
        .take(rows_to_take)
        .map(|r| r.to_json_map_with_options(decode_binary))
        .collect();

    if truncated {
        warn!(limit = row_limit, "Query result truncated");
    }

    Ok(QueryResult {
        columns,
        rows: json_rows,
        truncated,
        execution_time_ms,
    })
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> DbResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result.map_err(DbError::from)?);
    }
    Ok(rows)
}
