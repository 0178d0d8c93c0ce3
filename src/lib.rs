//! Read-only PostgreSQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools that let AI
//! assistants query a PostgreSQL database without being able to modify it.
//! Every statement is classified before execution and runs in a freshly
//! hardened read-only session.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::ReadOnlyService;
