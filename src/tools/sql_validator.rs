//! SQL statement classification for read-only enforcement.
//!
//! Every SQL string proposed by the client passes through [`classify`] before
//! any connection is opened. The decision combines three independent checks,
//! any of which vetoes execution:
//!
//! 1. the text must parse as PostgreSQL,
//! 2. a case-insensitive whole-word scan of the raw text must not hit a
//!    denied keyword (comments and literals included),
//! 3. every statement root must be read-only and no node anywhere in the
//!    tree, CTE bodies and subqueries included, may be a write or
//!    administrative construct.
//!
//! Uses [sqlparser](https://docs.rs/sqlparser/) and its `Visitor` to walk
//! the full AST, so formatting tricks and nested writes cannot slip through.

use std::ops::ControlFlow;
use std::sync::OnceLock;

use regex::Regex;
use sqlparser::ast::{Query, SetExpr, Statement, Visit, Visitor};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

/// Closed set of syntax-node kinds the policy reasons about.
///
/// Allowed roots, forbidden nodes and keyword ownership are all exhaustive
/// matches over this enum, so adding a kind forces a decision in each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Select,
    Union,
    With,
    Values,
    Subquery,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Truncate,
    Transaction,
    Command,
    Lock,
    Grant,
    Revoke,
    Copy,
    Listen,
    Notify,
    Refresh,
}

impl NodeKind {
    pub const ALL: [NodeKind; 21] = [
        NodeKind::Select,
        NodeKind::Union,
        NodeKind::With,
        NodeKind::Values,
        NodeKind::Subquery,
        NodeKind::Insert,
        NodeKind::Update,
        NodeKind::Delete,
        NodeKind::Create,
        NodeKind::Drop,
        NodeKind::Alter,
        NodeKind::Truncate,
        NodeKind::Transaction,
        NodeKind::Command,
        NodeKind::Lock,
        NodeKind::Grant,
        NodeKind::Revoke,
        NodeKind::Copy,
        NodeKind::Listen,
        NodeKind::Notify,
        NodeKind::Refresh,
    ];

    /// Roots a statement may have once its WITH prelude is unwrapped.
    pub fn is_read_only_root(self) -> bool {
        match self {
            NodeKind::Select
            | NodeKind::Union
            | NodeKind::With
            | NodeKind::Values
            | NodeKind::Subquery => true,
            NodeKind::Insert
            | NodeKind::Update
            | NodeKind::Delete
            | NodeKind::Create
            | NodeKind::Drop
            | NodeKind::Alter
            | NodeKind::Truncate
            | NodeKind::Transaction
            | NodeKind::Command
            | NodeKind::Lock
            | NodeKind::Grant
            | NodeKind::Revoke
            | NodeKind::Copy
            | NodeKind::Listen
            | NodeKind::Notify
            | NodeKind::Refresh => false,
        }
    }

    /// Kinds that reject the whole input wherever they appear in the tree.
    pub fn is_forbidden(self) -> bool {
        !self.is_read_only_root()
    }

    /// Keywords this kind contributes to the textual denylist.
    pub fn denied_keywords(self) -> &'static [&'static str] {
        match self {
            NodeKind::Select
            | NodeKind::Union
            | NodeKind::With
            | NodeKind::Values
            | NodeKind::Subquery => &[],
            NodeKind::Insert => &["INSERT"],
            NodeKind::Update => &["UPDATE"],
            NodeKind::Delete => &["DELETE"],
            NodeKind::Create => &["CREATE"],
            NodeKind::Drop => &["DROP"],
            NodeKind::Alter => &["ALTER"],
            NodeKind::Truncate => &["TRUNCATE"],
            // Transaction control is caught by the root whitelist and the tree walk.
            NodeKind::Transaction => &[],
            NodeKind::Command => &["VACUUM", "REINDEX", "CALL", "DO", "ANALYZE"],
            NodeKind::Lock => &["LOCK"],
            NodeKind::Grant => &["GRANT"],
            NodeKind::Revoke => &["REVOKE"],
            NodeKind::Copy => &["COPY"],
            NodeKind::Listen => &["LISTEN"],
            NodeKind::Notify => &["NOTIFY"],
            NodeKind::Refresh => &["REFRESH"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Select => "Select",
            NodeKind::Union => "Union",
            NodeKind::With => "With",
            NodeKind::Values => "Values",
            NodeKind::Subquery => "Subquery",
            NodeKind::Insert => "Insert",
            NodeKind::Update => "Update",
            NodeKind::Delete => "Delete",
            NodeKind::Create => "Create",
            NodeKind::Drop => "Drop",
            NodeKind::Alter => "Alter",
            NodeKind::Truncate => "Truncate",
            NodeKind::Transaction => "Transaction",
            NodeKind::Command => "Command",
            NodeKind::Lock => "Lock",
            NodeKind::Grant => "Grant",
            NodeKind::Revoke => "Revoke",
            NodeKind::Copy => "Copy",
            NodeKind::Listen => "Listen",
            NodeKind::Notify => "Notify",
            NodeKind::Refresh => "Refresh",
        }
    }
}

/// Full keyword denylist, in `NodeKind::ALL` order.
pub fn denied_keywords() -> Vec<&'static str> {
    NodeKind::ALL
        .iter()
        .flat_map(|kind| kind.denied_keywords().iter().copied())
        .collect()
}

fn denied_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?i)\b(?:{})\b", denied_keywords().join("|"));
        Regex::new(&pattern).expect("denied keyword pattern is valid")
    })
}

/// Why a statement was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Invalid SQL: {0}")]
    InvalidSql(String),

    #[error("No SQL statements found")]
    NoStatements,

    #[error("Write or unsafe operation keyword detected; query blocked")]
    UnsafeKeyword { keyword: String },

    #[error("WITH without a statement is not allowed")]
    WithoutStatement,

    #[error("Only read-only queries are allowed (SELECT/VALUES/UNION/WITH)")]
    NotReadOnly { root: NodeKind },

    #[error("Write or unsafe operation detected; query blocked")]
    UnsafeOperation { node: NodeKind },
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Authorized,
    Rejected(Rejection),
}

impl Classification {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Classification::Authorized)
    }

    /// Human-readable reason, present iff the statement was rejected.
    pub fn reason(&self) -> Option<String> {
        match self {
            Classification::Authorized => None,
            Classification::Rejected(rejection) => Some(rejection.to_string()),
        }
    }

    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Classification::Authorized => Ok(()),
            Classification::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Decide whether `sql` is safe to execute on a read-only session.
///
/// Pure: no I/O and no shared state. Never panics on malformed input; a parse
/// failure is itself a rejection.
///
/// # Examples
///
/// ```
/// use pg_readonly_mcp::tools::sql_validator::classify;
///
/// assert!(classify("SELECT * FROM users").is_authorized());
/// assert!(!classify("select 1; DROP table x").is_authorized());
/// ```
pub fn classify(sql: &str) -> Classification {
    match evaluate(sql) {
        Ok(()) => Classification::Authorized,
        Err(rejection) => Classification::Rejected(rejection),
    }
}

/// Classify `sql` and map a rejection onto the crate error type.
///
/// Syntax problems surface as [`DbError::Parse`], everything else as
/// [`DbError::PolicyViolation`].
pub fn ensure_read_only(sql: &str) -> DbResult<()> {
    match classify(sql).into_result() {
        Ok(()) => {
            debug!(sql_len = sql.len(), "Statement authorized");
            Ok(())
        }
        Err(rejection) => {
            warn!(reason = %rejection, "Statement rejected");
            Err(match rejection {
                Rejection::InvalidSql(message) => DbError::parse(message),
                Rejection::NoStatements => DbError::parse(Rejection::NoStatements.to_string()),
                other => DbError::policy_violation(other.to_string()),
            })
        }
    }
}

/// Reject input holding more than one statement.
///
/// Over the simple query protocol every statement's rows arrive on the same
/// stream, so a single tabular result needs a single statement.
pub fn ensure_single_statement(sql: &str) -> DbResult<()> {
    let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| DbError::parse(e.to_string()))?;
    if statements.len() > 1 {
        warn!(statements = statements.len(), "Multi-statement input rejected");
        return Err(DbError::invalid_input(format!(
            "expected a single statement, found {}; send each query separately",
            statements.len()
        )));
    }
    Ok(())
}

fn evaluate(sql: &str) -> Result<(), Rejection> {
    let dialect = PostgreSqlDialect {};

    let statements = match Parser::parse_sql(&dialect, sql) {
        Ok(statements) => statements,
        Err(_) if is_bare_cte_prelude(sql) => return Err(Rejection::WithoutStatement),
        Err(e) => return Err(Rejection::InvalidSql(e.to_string())),
    };

    if statements.is_empty() {
        return Err(Rejection::NoStatements);
    }

    if let Some(found) = denied_keyword_regex().find(sql) {
        return Err(Rejection::UnsafeKeyword {
            keyword: found.as_str().to_ascii_uppercase(),
        });
    }

    for stmt in &statements {
        let root = root_kind(stmt);
        if !root.is_read_only_root() {
            return Err(Rejection::NotReadOnly { root });
        }
    }

    for stmt in &statements {
        let mut finder = ForbiddenNodeFinder;
        if let ControlFlow::Break(node) = stmt.visit(&mut finder) {
            return Err(Rejection::UnsafeOperation { node });
        }
    }

    Ok(())
}

/// `WITH a AS (...)[, b AS (...)]` followed only by semicolons.
fn is_bare_cte_prelude(sql: &str) -> bool {
    let dialect = PostgreSqlDialect {};
    let Ok(mut parser) = Parser::new(&dialect).try_with_sql(sql) else {
        return false;
    };
    if !parser.parse_keyword(Keyword::WITH) {
        return false;
    }
    // RECURSIVE is optional in front of the CTE list.
    let _ = parser.parse_keyword(Keyword::RECURSIVE);
    if parser.parse_comma_separated(Parser::parse_cte).is_err() {
        return false;
    }
    while parser.consume_token(&Token::SemiColon) {}
    parser.peek_token().token == Token::EOF
}

/// Root kind after unwrapping a leading WITH prelude.
fn root_kind(stmt: &Statement) -> NodeKind {
    match stmt {
        Statement::Query(query) => set_expr_kind(&query.body),
        other => statement_kind(other),
    }
}

fn query_kind(query: &Query) -> NodeKind {
    let body = set_expr_kind(&query.body);
    if query.with.is_some() && !body.is_forbidden() {
        NodeKind::With
    } else {
        body
    }
}

fn set_expr_kind(expr: &SetExpr) -> NodeKind {
    match expr {
        SetExpr::Select(select) if select.into.is_some() => NodeKind::Create,
        SetExpr::Select(_) => NodeKind::Select,
        SetExpr::Query(_) => NodeKind::Subquery,
        SetExpr::SetOperation { left, right, .. } => {
            let left = set_expr_kind(left);
            let right = set_expr_kind(right);
            if left.is_forbidden() {
                left
            } else if right.is_forbidden() {
                right
            } else {
                NodeKind::Union
            }
        }
        SetExpr::Values(_) => NodeKind::Values,
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => statement_kind(stmt),
        _ => NodeKind::Command,
    }
}

/// Project a parsed statement onto [`NodeKind`]. Anything not explicitly
/// read-only falls through to `Command`.
fn statement_kind(stmt: &Statement) -> NodeKind {
    match stmt {
        Statement::Query(query) => query_kind(query),

        Statement::Insert { .. } => NodeKind::Insert,
        Statement::Update { .. } => NodeKind::Update,
        Statement::Delete { .. } => NodeKind::Delete,
        Statement::Copy { .. } | Statement::CopyIntoSnowflake { .. } => NodeKind::Copy,

        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreateType { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateProcedure { .. }
        | Statement::CreateTrigger { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSecret { .. }
        | Statement::CreateStage { .. }
        | Statement::CreateVirtualTable { .. }
        | Statement::CreateExtension { .. }
        | Statement::CreatePolicy { .. }
        | Statement::CreateConnector { .. } => NodeKind::Create,

        Statement::AlterTable { .. }
        | Statement::AlterView { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterSchema { .. }
        | Statement::AlterRole { .. }
        | Statement::AlterSession { .. }
        | Statement::AlterPolicy { .. }
        | Statement::AlterType { .. }
        | Statement::AlterConnector { .. } => NodeKind::Alter,

        Statement::Drop { .. }
        | Statement::DropFunction { .. }
        | Statement::DropProcedure { .. }
        | Statement::DropTrigger { .. }
        | Statement::DropSecret { .. }
        | Statement::DropPolicy { .. }
        | Statement::DropConnector { .. } => NodeKind::Drop,

        Statement::Truncate { .. } => NodeKind::Truncate,

        Statement::StartTransaction { .. }
        | Statement::Commit { .. }
        | Statement::Rollback { .. }
        | Statement::Savepoint { .. }
        | Statement::ReleaseSavepoint { .. } => NodeKind::Transaction,

        Statement::Grant { .. } => NodeKind::Grant,
        Statement::Revoke { .. } => NodeKind::Revoke,
        Statement::LockTables { .. } | Statement::UnlockTables { .. } => NodeKind::Lock,
        Statement::LISTEN { .. } | Statement::UNLISTEN { .. } => NodeKind::Listen,
        Statement::NOTIFY { .. } => NodeKind::Notify,

        // MERGE, CALL, VACUUM, ANALYZE, SET, SHOW, EXPLAIN, PREPARE, ...
        _ => NodeKind::Command,
    }
}

/// Stops the walk at the first forbidden node.
struct ForbiddenNodeFinder;

impl Visitor for ForbiddenNodeFinder {
    type Break = NodeKind;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        let kind = statement_kind(statement);
        if kind.is_forbidden() {
            return ControlFlow::Break(kind);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        // FOR UPDATE / FOR SHARE
        if !query.locks.is_empty() {
            return ControlFlow::Break(NodeKind::Lock);
        }
        let kind = set_expr_kind(&query.body);
        if kind.is_forbidden() {
            return ControlFlow::Break(kind);
        }
        ControlFlow::Continue(())
    }
}
