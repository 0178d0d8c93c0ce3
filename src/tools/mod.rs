//! MCP tool implementations.
//!
//! This module contains all database tool handlers:
//! - `query`: Execute a single read-only statement (`run_read_query`)
//! - `schema`: `list_schemas`, `list_tables` and `describe_table`
//! - `sql_validator`: Statement classification for read-only enforcement

pub mod query;
pub mod schema;
pub mod sql_validator;

pub use query::{QueryOutput, QueryToolHandler, ReadQueryInput};
pub use schema::{
    DescribeTableInput, DescribeTableOutput, ListSchemasOutput, ListTablesInput,
    ListTablesOutput, SchemaToolHandler,
};
