//! Read-only PostgreSQL MCP Server - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to explore and query a PostgreSQL database without modifying it.

use clap::Parser;
use pg_readonly_mcp::config::Config;
use pg_readonly_mcp::transport::{StdioTransport, Transport};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the MCP protocol stream.
fn init_tracing(config: &Config) {
    if !config.enable_logs {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!("Starting pg-readonly-mcp v{}", env!("CARGO_PKG_VERSION"));

    // A missing URL is reported per tool call so an agent can still list the
    // tools and read the error.
    match config.database_display() {
        Some(database) => info!(
            database = %database,
            default_schema = %config.default_schema,
            max_rows = config.max_rows,
            statement_timeout_ms = config.statement_timeout_ms,
            "Using PostgreSQL database"
        ),
        None => warn!("No database URL configured (set PG_URL or --database-url)"),
    }

    let transport = StdioTransport::new(config.execution_defaults());
    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
