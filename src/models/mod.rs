//! Data models for the read-only PostgreSQL MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod query;
pub mod schema;

// Re-export commonly used types
pub use query::{
    ColumnMetadata, DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, MAX_STATEMENT_TIMEOUT_MS, QueryRequest,
    QueryResult, clamp_timeout_ms,
};
pub use schema::{ColumnDefinition, TableSchema};
