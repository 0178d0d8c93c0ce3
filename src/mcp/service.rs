//! MCP service implementation using rmcp.
//!
//! This module defines the ReadOnlyService struct with the read-only database
//! tools exposed via the MCP protocol using the rmcp framework's macros.

use crate::config::ExecutionDefaults;
use crate::tools::query::{QueryOutput, QueryToolHandler, ReadQueryInput};
use crate::tools::schema::{
    DescribeTableInput, DescribeTableOutput, ListSchemasOutput, ListTablesInput,
    ListTablesOutput, SchemaToolHandler,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ReadOnlyService {
    query_handler: Arc<QueryToolHandler>,
    schema_handler: Arc<SchemaToolHandler>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl ReadOnlyService {
    /// Create a new ReadOnlyService instance.
    ///
    /// No connection is made here; every tool call opens and discards its own
    /// hardened session.
    pub fn new(defaults: ExecutionDefaults) -> Self {
        Self {
            query_handler: Arc::new(QueryToolHandler::new(defaults.clone())),
            schema_handler: Arc::new(SchemaToolHandler::new(defaults)),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl ReadOnlyService {
    #[tool(
        description = "Run a single read-only SQL statement against PostgreSQL and return rows.\nOnly SELECT, VALUES and WITH ... SELECT are accepted; anything that could modify data, take locks or change session state is rejected before reaching the database.\nSend one statement per call; multiple statements are rejected.\nThe session is read-only with a statement timeout (timeout_ms, default 10000) and an idle-in-transaction timeout (idle_timeout_ms). Results are capped at max_rows (default 5000); `truncated` is true when more rows were available."
    )]
    async fn run_read_query(
        &self,
        Parameters(input): Parameters<ReadQueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query_handler
            .run_read_query(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "List non-system schemas in the database.")]
    async fn list_schemas(&self) -> Result<Json<ListSchemasOutput>, McpError> {
        self.schema_handler
            .list_schemas()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "List base tables in a schema, ordered by name.\nOmit `schema` to use the server's default schema (usually \"public\")."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        self.schema_handler
            .list_tables(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Describe a table's columns (name, data type, nullable) in ordinal order.\nOmit `schema` to use the server's default schema."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        self.schema_handler
            .describe_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for ReadOnlyService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "pg-readonly-mcp".to_owned(),
                title: Some("Read-only PostgreSQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only tools for exploring and querying a PostgreSQL database.\n\
                \n\
                ## Workflow\n\
                1. Call `list_schemas` to see which schemas exist\n\
                2. Call `list_tables` for a schema, then `describe_table` for the tables you need\n\
                3. Use `run_read_query` with a single SELECT, VALUES or WITH ... SELECT statement\n\
                \n\
                ## Rejected statements\n\
                Writes, DDL, locks (including SELECT ... FOR UPDATE), SELECT INTO, session changes\n\
                (SET, RESET, DISCARD) and maintenance commands (VACUUM, ANALYZE, COPY, CALL, DO) are\n\
                blocked. Resubmitting a blocked statement will not help; rewrite it as a plain query.\n\
                \n\
                ## Limits\n\
                - `max_rows` defaults to 5000 and is capped at 10000\n\
                - `timeout_ms` defaults to 10000; timeouts are retryable with a simpler query"
                    .to_string(),
            ),
        }
    }
}
