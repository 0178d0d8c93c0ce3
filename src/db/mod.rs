//! Database layer.
//!
//! This module provides database access functionality:
//! - Hardened read-only sessions (one `PgConnection` per request)
//! - Bounded query execution
//! - Schema introspection
//! - Type mappings

pub mod executor;
pub mod schema;
pub mod session;
pub mod types;

pub use executor::QueryExecutor;
pub use schema::SchemaInspector;
pub use session::{SessionConfig, SessionHandle, run_scoped, with_readonly_session};
