//! Opt-in syntax check for synthesized SQL.
//!
//! The completion text is normally trusted as-is. With the check enabled, it is
//! parsed with [sqlparser](https://docs.rs/sqlparser/) in the connection's
//! dialect first, and a parse failure takes the place of the query result
//! exactly like a database error would.

use crate::error::{InsightError, InsightResult};
use crate::models::{DatabaseType, SqlQuery};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect};
use sqlparser::parser::Parser;

const PARSE_ERROR: &str = "Failed to parse SQL statement.";

/// Get the appropriate SQL dialect for the given database type.
fn get_dialect(db_type: DatabaseType) -> Box<dyn Dialect> {
    match db_type {
        DatabaseType::PostgreSQL => Box::new(PostgreSqlDialect {}),
        DatabaseType::MySQL => Box::new(MySqlDialect {}),
        DatabaseType::SQLite => Box::new(SQLiteDialect {}),
    }
}

/// Parse `query` in the dialect of `db_type`.
///
/// Returns [`InsightError::Query`] when the text is empty or does not parse,
/// so callers can treat it the same as a failed execution.
///
/// ```
/// use sql_insight::chain::validator::check_syntax;
/// use sql_insight::models::{DatabaseType, SqlQuery};
///
/// assert!(check_syntax(&SqlQuery::new("SELECT Name FROM Artist LIMIT 10;"), DatabaseType::MySQL).is_ok());
/// assert!(check_syntax(&SqlQuery::new("```sql\nSELECT 1;\n```"), DatabaseType::MySQL).is_err());
/// ```
pub fn check_syntax(query: &SqlQuery, db_type: DatabaseType) -> InsightResult<()> {
    let dialect = get_dialect(db_type);

    let statements = Parser::parse_sql(dialect.as_ref(), query.as_str())
        .map_err(|e| InsightError::query(format!("{} Error: {}", PARSE_ERROR, e), None))?;

    if statements.is_empty() {
        return Err(InsightError::query("Empty SQL statement", None));
    }
    Ok(())
}
