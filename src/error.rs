//! Error types for the read-only PostgreSQL MCP server.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Each variant tells the caller (usually an AI assistant) whether resubmitting
//! can help: parse errors and policy violations are final, timeouts and
//! connection failures are retryable.

use thiserror::Error;

/// SQLSTATE raised when a statement exceeds `statement_timeout`.
const SQLSTATE_QUERY_CANCELED: &str = "57014";
/// SQLSTATE raised when `idle_in_transaction_session_timeout` fires.
const SQLSTATE_IDLE_IN_TRANSACTION_TIMEOUT: &str = "25P03";
/// SQLSTATE raised when a write is attempted in a read-only transaction.
const SQLSTATE_READ_ONLY_TRANSACTION: &str = "25006";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid SQL: {message}")]
    Parse { message: String },

    #[error("{reason}")]
    PolicyViolation { reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Timeout: {operation} exceeded {limit_ms}ms")]
    Timeout { operation: String, limit_ms: u64 },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a policy violation (classifier or engine refused the statement).
    pub fn policy_violation(reason: impl Into<String>) -> Self {
        Self::PolicyViolation {
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, limit_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit_ms,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::Timeout { .. } => {
                Some("Narrow the query or resubmit with a higher timeout_ms")
            }
            Self::PolicyViolation { .. } => {
                Some("Only SELECT, VALUES, UNION and WITH ... SELECT queries can run")
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Fill in the configured limit on a timeout reported by the engine.
    pub fn with_timeout_limit(self, limit_ms: u64) -> Self {
        match self {
            Self::Timeout {
                operation,
                limit_ms: 0,
            } => Self::Timeout {
                operation,
                limit_ms,
            },
            other => other,
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                match code.as_deref() {
                    Some(SQLSTATE_QUERY_CANCELED) => DbError::timeout(db_err.message(), 0),
                    Some(SQLSTATE_IDLE_IN_TRANSACTION_TIMEOUT) => {
                        DbError::timeout(db_err.message(), 0)
                    }
                    Some(SQLSTATE_READ_ONLY_TRANSACTION) => DbError::policy_violation(format!(
                        "database refused the statement: {}",
                        db_err.message()
                    )),
                    _ => DbError::database(
                        db_err.message(),
                        code,
                        "Check the SQL syntax and referenced objects",
                    ),
                }
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            // Refusals and bad input -> invalid_params
            DbError::Parse { .. } | DbError::PolicyViolation { .. } | DbError::InvalidInput { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }

            DbError::Schema { .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                suggestion_data(Some("Call list_schemas and list_tables to find valid names")),
            ),

            // Database errors -> invalid_params with sql_state in message
            DbError::Database {
                message,
                sql_state,
                suggestion,
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, suggestion_data(Some(suggestion)))
            }

            // Connection, Timeout -> internal_error (retryable by the caller)
            DbError::Connection { .. } | DbError::Timeout { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }

            DbError::Configuration { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some("Start the server with --database-url or set PG_URL")),
            ),

            DbError::Internal { .. } => rmcp::ErrorData::internal_error(err.to_string(), None),
        }
    }
}
