//! Query execution engine.
//!
//! Runs synthesized SQL verbatim against the active connection:
//! - Statements that produce rows are streamed, stopping one row past the limit
//! - Everything else runs as a write and reports affected rows
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules
//! (`mysql`, `postgres`, `sqlite`). Each provides identical functionality
//! adapted to the database's row type.

use crate::config::{DEFAULT_MAX_ROWS, MAX_ROWS_LIMIT};
use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::InsightResult;
use crate::models::{QueryResult, SqlQuery};
use futures_util::StreamExt;
use std::time::Instant;
use tracing::{debug, warn};

/// Leading keywords of statements that return a result set.
const ROW_RETURNING_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "PRAGMA", "VALUES", "TABLE",
];

/// Query executor that handles database query execution.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    max_rows: u32,
}

impl QueryExecutor {
    /// Create a new query executor with default settings.
    pub fn new() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Create a query executor with a custom row cap, clamped to `[1, MAX_ROWS_LIMIT]`.
    pub fn with_max_rows(max_rows: u32) -> Self {
        Self {
            max_rows: max_rows.clamp(1, MAX_ROWS_LIMIT),
        }
    }

    pub fn max_rows(&self) -> u32 {
        self.max_rows
    }

    /// Execute a statement exactly as given.
    ///
    /// Driver failures come back as [`crate::error::InsightError::Query`] so the
    /// caller can hand the error text to the answer stage.
    pub async fn execute(&self, pool: &DbPool, query: &SqlQuery) -> InsightResult<QueryResult> {
        let start = Instant::now();
        let sql = query.as_str();

        if !returns_rows(sql) {
            debug!(sql = %sql, "Executing write statement");
            let rows_affected = match pool {
                DbPool::MySql(p) => mysql::execute_write(p, sql).await?,
                DbPool::Postgres(p) => postgres::execute_write(p, sql).await?,
                DbPool::SQLite(p) => sqlite::execute_write(p, sql).await?,
            };
            let execution_time_ms = start.elapsed().as_millis() as u64;
            return Ok(QueryResult::write_result(rows_affected, execution_time_ms));
        }

        debug!(sql = %sql, limit = self.max_rows, "Executing query");

        match pool {
            DbPool::MySql(p) => {
                let rows = mysql::fetch_rows(p, sql, self.max_rows).await?;
                Ok(process_rows(rows, self.max_rows, start))
            }
            DbPool::Postgres(p) => {
                let rows = postgres::fetch_rows(p, sql, self.max_rows).await?;
                Ok(process_rows(rows, self.max_rows, start))
            }
            DbPool::SQLite(p) => {
                let rows = sqlite::fetch_rows(p, sql, self.max_rows).await?;
                Ok(process_rows(rows, self.max_rows, start))
            }
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a statement is expected to produce a result set, judged by its
/// first keyword after leading whitespace, comments and parentheses.
///
/// Unrecognized text (including markdown-fenced SQL) is treated as a write,
/// which lets the database report the syntax error.
pub fn returns_rows(sql: &str) -> bool {
    let mut rest = sql.trim_start();
    loop {
        if let Some(stripped) = rest.strip_prefix("--") {
            rest = stripped.split_once('\n').map(|(_, r)| r).unwrap_or("");
        } else if let Some(stripped) = rest.strip_prefix("/*") {
            rest = stripped.split_once("*/").map(|(_, r)| r).unwrap_or("");
        } else if let Some(stripped) = rest.strip_prefix('(') {
            rest = stripped;
        } else {
            break;
        }
        rest = rest.trim_start();
    }

    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    ROW_RETURNING_KEYWORDS.contains(&keyword.as_str())
}

/// Process rows from any database type into a QueryResult.
fn process_rows<R: RowToJson>(rows: Vec<R>, row_limit: u32, start: Instant) -> QueryResult {
    let execution_time_ms = start.elapsed().as_millis() as u64;

    let Some(first) = rows.first() else {
        return QueryResult::empty(execution_time_ms);
    };

    let columns = first.get_column_metadata();
    let total_rows = rows.len();
    let has_more = total_rows > row_limit as usize;

    let json_rows: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .take(row_limit as usize)
        .map(|r| r.to_json_values())
        .collect();

    if has_more {
        warn!(limit = row_limit, "Query result truncated");
    }

    QueryResult {
        columns,
        rows: json_rows,
        rows_affected: None,
        truncated: has_more,
        execution_time_ms,
    }
}

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> InsightResult<Vec<R>> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result?);
    }
    Ok(rows)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Raw SQL goes through `Executor::fetch`/`execute` on `&str`, which skips
// prepared statements so any statement the server accepts can run.

mod mysql {
    use super::*;
    use sqlx::Executor;
    use sqlx::MySqlPool;
    use sqlx::mysql::MySqlRow;

    pub async fn fetch_rows(
        pool: &MySqlPool,
        sql: &str,
        row_limit: u32,
    ) -> InsightResult<Vec<MySqlRow>> {
        let fetch_limit = row_limit as usize + 1;
        let results = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>().await;
        collect_rows(results)
    }

    pub async fn execute_write(pool: &MySqlPool, sql: &str) -> InsightResult<u64> {
        Ok(pool.execute(sql).await?.rows_affected())
    }
}

mod postgres {
    use super::*;
    use sqlx::Executor;
    use sqlx::PgPool;
    use sqlx::postgres::PgRow;

    pub async fn fetch_rows(
        pool: &PgPool,
        sql: &str,
        row_limit: u32,
    ) -> InsightResult<Vec<PgRow>> {
        let fetch_limit = row_limit as usize + 1;
        let results = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>().await;
        collect_rows(results)
    }

    pub async fn execute_write(pool: &PgPool, sql: &str) -> InsightResult<u64> {
        Ok(pool.execute(sql).await?.rows_affected())
    }
}

mod sqlite {
    use super::*;
    use sqlx::Executor;
    use sqlx::SqlitePool;
    use sqlx::sqlite::SqliteRow;

    pub async fn fetch_rows(
        pool: &SqlitePool,
        sql: &str,
        row_limit: u32,
    ) -> InsightResult<Vec<SqliteRow>> {
        let fetch_limit = row_limit as usize + 1;
        let results = pool.fetch(sql).take(fetch_limit).collect::<Vec<_>>().await;
        collect_rows(results)
    }

    pub async fn execute_write(pool: &SqlitePool, sql: &str) -> InsightResult<u64> {
        Ok(pool.execute(sql).await?.rows_affected())
    }
}
