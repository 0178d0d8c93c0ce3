//! Query-related data models.
//!
//! This module defines types for read-query requests and results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Default row limit for query results.
pub const DEFAULT_ROW_LIMIT: u32 = 5000;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 10000;

/// Maximum statement timeout in milliseconds (5 minutes).
pub const MAX_STATEMENT_TIMEOUT_MS: u64 = 300_000;

/// Clamp a requested timeout to `[1, MAX_STATEMENT_TIMEOUT_MS]`.
///
/// Zero is not passed through: PostgreSQL reads a zero timeout as "no limit".
pub fn clamp_timeout_ms(ms: u64) -> u64 {
    ms.clamp(1, MAX_STATEMENT_TIMEOUT_MS)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    /// Default: 5000, max: 10000
    #[serde(default)]
    pub max_rows: Option<u32>,
    /// Statement timeout override in milliseconds, max: 300000
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Idle-in-transaction timeout override in milliseconds, max: 300000
    #[serde(default)]
    pub idle_timeout_ms: Option<u64>,
    /// Default: false
    #[serde(default)]
    pub decode_binary: bool,
}

impl QueryRequest {
    /// Create a new query request with default options.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            max_rows: None,
            timeout_ms: None,
            idle_timeout_ms: None,
            decode_binary: false,
        }
    }

    /// Set the row limit.
    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Set the statement timeout.
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the idle-in-transaction timeout.
    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: u64) -> Self {
        self.idle_timeout_ms = Some(idle_timeout_ms);
        self
    }

    /// Get the effective row limit, clamped to `[1, MAX_ROW_LIMIT]`.
    pub fn effective_limit(&self, default_limit: u32) -> u32 {
        // limit=0 would mark every non-empty result as truncated
        self.max_rows
            .unwrap_or(default_limit)
            .clamp(1, MAX_ROW_LIMIT)
    }

    /// Whether the caller asked for more rows than the server will return.
    pub fn exceeds_row_limit(&self) -> bool {
        self.max_rows.is_some_and(|l| l > MAX_ROW_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// PostgreSQL type name (e.g., "INT8", "TEXT", "TIMESTAMPTZ")
    pub type_name: String,
    pub nullable: bool,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
    /// True when rows beyond the limit were withheld.
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create an empty result.
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            truncated: false,
            execution_time_ms,
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
