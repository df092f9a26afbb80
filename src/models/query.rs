//! Query-related data models.
//!
//! This module defines the synthesized SQL statement and the result of running it.

use crate::format::{ColumnInfo, format_as_table};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A SQL statement produced by the query synthesizer.
///
/// Holds the completion text exactly as received: no trimming, no fence
/// stripping, no validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqlQuery(String);

impl SqlQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    /// Database-specific type (e.g., "INT", "VARCHAR", "TEXT")
    pub type_name: String,
}

impl ColumnMetadata {
    /// Create new column metadata.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMetadata>,
    /// Values by column position, parallel to `columns`.
    pub rows: Vec<Vec<JsonValue>>,
    /// Statements without a result set report affected rows instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_affected: Option<u64>,
    pub truncated: bool,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create an empty result.
    pub fn empty(execution_time_ms: u64) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: None,
            truncated: false,
            execution_time_ms,
        }
    }

    /// Create a result for statements that return no rows (INSERT/UPDATE/DDL).
    pub fn write_result(rows_affected: u64, execution_time_ms: u64) -> Self {
        Self {
            rows_affected: Some(rows_affected),
            ..Self::empty(execution_time_ms)
        }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Render the result as the text handed to the answer prompt.
    pub fn to_text(&self) -> String {
        if let Some(affected) = self.rows_affected {
            let row_text = if affected == 1 { "row" } else { "rows" };
            return format!(
                "Query OK, {} {} affected ({:.2} sec)",
                affected,
                row_text,
                self.execution_time_ms as f64 / 1000.0
            );
        }

        let columns: Vec<ColumnInfo> = self
            .columns
            .iter()
            .map(|c| ColumnInfo::new(&c.name))
            .collect();
        let mut text = format_as_table(
            &columns,
            &self.rows,
            self.row_count(),
            self.execution_time_ms,
        );
        if self.truncated {
            text.push_str(&format!(
                "(result truncated to the first {} rows)\n",
                self.row_count()
            ));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artist_result() -> QueryResult {
        QueryResult {
            columns: vec![ColumnMetadata::new("Name", "VARCHAR")],
            rows: vec![vec![json!("AC/DC")]],
            rows_affected: None,
            truncated: false,
            execution_time_ms: 12,
        }
    }

    #[test]
    fn test_sql_query_kept_verbatim() {
        let raw = "```sql\nSELECT 1;\n```  ";
        let query = SqlQuery::new(raw);
        assert_eq!(query.as_str(), raw);
        assert_eq!(query.to_string(), raw);
    }

    #[test]
    fn test_result_text_contains_rows() {
        let text = artist_result().to_text();
        assert!(text.contains("| Name  |"));
        assert!(text.contains("| AC/DC |"));
        assert!(text.contains("1 row in set"));
    }

    #[test]
    fn test_truncated_result_is_flagged() {
        let result = QueryResult {
            truncated: true,
            ..artist_result()
        };
        assert!(result.to_text().contains("truncated to the first 1 rows"));
    }

    #[test]
    fn test_empty_result_text() {
        assert_eq!(QueryResult::empty(0).to_text(), "Empty set");
    }

    #[test]
    fn test_write_result_text() {
        let text = QueryResult::write_result(3, 1500).to_text();
        assert_eq!(text, "Query OK, 3 rows affected (1.50 sec)");
    }
}
