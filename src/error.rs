//! Error types for SQLInsight.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every variant is terminal for the turn that raised it: nothing is retried, and the
//! rendered message is what ends up in front of the user.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Query error: {message}")]
    Query {
        message: String,
        /// e.g., "42S02" for an unknown table on MySQL
        sql_state: Option<String>,
    },

    #[error("Synthesis failed ({stage}): {message}")]
    Synthesis { stage: String, message: String },

    #[error("Not connected to a database. Use /connect first.")]
    NotConnected,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl InsightError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a query error with optional SQL state.
    pub fn query(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a synthesis error for the given pipeline stage.
    pub fn synthesis(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Synthesis {
            stage: stage.into(),
            message: message.into(),
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

    /// Re-label a synthesis error with the pipeline stage that raised it.
    ///
    /// Other variants pass through unchanged.
    pub fn at_stage(self, stage: impl Into<String>) -> Self {
        match self {
            Self::Synthesis { message, .. } => Self::synthesis(stage, message),
            other => other,
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::NotConnected => Some("Run /connect to open a database connection"),
            _ => None,
        }
    }

    /// Text handed to the answer prompt in place of a query result.
    ///
    /// Query errors keep their SQL state so the model can explain the failure.
    pub fn as_result_text(&self) -> String {
        match self {
            Self::Query {
                message,
                sql_state: Some(code),
            } => format!("Error: {} (SQLSTATE: {})", message, code),
            Self::Query { message, .. } => format!("Error: {}", message),
            other => format!("Error: {}", other),
        }
    }
}

/// Convert sqlx errors to InsightError.
///
/// Execution-time failures land in `Query`; anything about reaching the server
/// lands in `Connection`.
impl From<sqlx::Error> for InsightError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => InsightError::connection(
                msg.to_string(),
                "Check the connection settings (host, port, user, password, database)",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                InsightError::query(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => InsightError::query("No rows returned", None),
            sqlx::Error::PoolTimedOut => InsightError::connection(
                "Timed out waiting for a database connection",
                "Check that the database server is reachable",
            ),
            sqlx::Error::PoolClosed => {
                InsightError::connection("Connection pool is closed", "Reconnect to the database")
            }
            sqlx::Error::Io(io_err) => InsightError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => InsightError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => InsightError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                InsightError::query(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnDecode { index, source } => InsightError::query(
                format!("Failed to decode column {}: {}", index, source),
                None,
            ),
            sqlx::Error::Decode(source) => {
                InsightError::query(format!("Decode error: {}", source), None)
            }
            sqlx::Error::WorkerCrashed => InsightError::internal("Database worker crashed"),
            _ => InsightError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Convert HTTP client errors raised while talking to the completion service.
impl From<reqwest::Error> for InsightError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_connect() {
            format!("completion service unreachable: {}", err)
        } else if err.is_timeout() {
            format!("completion request timed out: {}", err)
        } else if err.is_decode() {
            format!("malformed completion response: {}", err)
        } else {
            err.to_string()
        };
        InsightError::synthesis("completion", message)
    }
}

/// Result type alias for SQLInsight operations.
pub type InsightResult<T> = Result<T, InsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InsightError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = InsightError::connection("refused", "Start the server");
        assert_eq!(err.suggestion(), Some("Start the server"));
        assert!(InsightError::NotConnected.suggestion().is_some());
        assert_eq!(InsightError::schema("stale").suggestion(), None);
    }

    #[test]
    fn test_synthesis_display_names_stage() {
        let err = InsightError::synthesis("sql query", "HTTP 503");
        assert_eq!(err.to_string(), "Synthesis failed (sql query): HTTP 503");
    }

    #[test]
    fn test_query_result_text_includes_sql_state() {
        let err = InsightError::query("Unknown column 'Nme'", Some("42S22".to_string()));
        assert_eq!(
            err.as_result_text(),
            "Error: Unknown column 'Nme' (SQLSTATE: 42S22)"
        );
    }

    #[test]
    fn test_query_result_text_without_sql_state() {
        let err = InsightError::query("near \"SELEC\": syntax error", None);
        assert_eq!(err.as_result_text(), "Error: near \"SELEC\": syntax error");
    }

    #[test]
    fn test_non_query_result_text_uses_display() {
        let err = InsightError::schema("no tables");
        assert_eq!(err.as_result_text(), "Error: Schema error: no tables");
    }

    #[test]
    fn test_row_not_found_maps_to_query() {
        let err: InsightError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, InsightError::Query { .. }));
    }

    #[test]
    fn test_pool_closed_maps_to_connection() {
        let err: InsightError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, InsightError::Connection { .. }));
    }

    #[test]
    fn test_at_stage_relabels_only_synthesis() {
        let err = InsightError::synthesis("completion", "HTTP 500").at_stage("answer");
        assert_eq!(err.to_string(), "Synthesis failed (answer): HTTP 500");

        let err = InsightError::NotConnected.at_stage("answer");
        assert!(matches!(err, InsightError::NotConnected));
    }
}
