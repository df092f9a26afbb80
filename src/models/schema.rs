//! Schema-related data models.
//!
//! This module defines the introspected table metadata and the textual schema
//! description embedded in both prompts.

use crate::format::{ColumnInfo, format_as_tsv};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
    pub foreign_keys: Vec<ForeignKey>,
    /// First rows of the table; `None` when sampling is disabled or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<TableSample>,
}

impl TableSchema {
    /// Create a new table schema.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            sample: None,
        }
    }

    /// Add a column definition.
    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a foreign key.
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Attach sample rows.
    pub fn with_sample(mut self, sample: TableSample) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Render as a `CREATE TABLE` block followed by the sample rows comment.
    pub fn to_description(&self) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|col| {
                let mut line = format!("\t{} {}", col.name, col.data_type.to_uppercase());
                if !col.nullable {
                    line.push_str(" NOT NULL");
                }
                if let Some(ref default) = col.default_value {
                    line.push_str(&format!(" DEFAULT {}", default));
                }
                line
            })
            .collect();

        let primary_key = self.primary_key();
        if !primary_key.is_empty() {
            lines.push(format!("\tPRIMARY KEY ({})", primary_key.join(", ")));
        }
        for fk in &self.foreign_keys {
            lines.push(format!(
                "\tFOREIGN KEY({}) REFERENCES {} ({})",
                fk.column, fk.references_table, fk.references_column
            ));
        }

        let mut out = format!(
            "CREATE TABLE {} (\n{}\n)",
            self.table_name,
            lines.join(", \n")
        );

        if let Some(ref sample) = self.sample {
            out.push_str(&format!(
                "\n\n/*\n{} rows from {} table:\n{}\n*/",
                sample.requested,
                self.table_name,
                sample.to_text()
            ));
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Full type (e.g., `varchar(30)`, `bigint unsigned`)
    pub data_type: String,
    pub nullable: bool,
    /// Default expression as reported by the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

impl ColumnDefinition {
    /// Create a new column definition.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_value: None,
            is_primary_key: false,
        }
    }

    /// Set whether this is a primary key column.
    pub fn with_primary_key(mut self, is_pk: bool) -> Self {
        self.is_primary_key = is_pk;
        self
    }

    /// Set the default expression.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

impl ForeignKey {
    /// Create a new foreign key.
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
        }
    }
}

/// A handful of rows read from a table to show the model what the data looks like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSample {
    /// How many rows were asked for (the table may hold fewer).
    pub requested: u32,
    pub columns: Vec<String>,
    /// Values by column position, parallel to `columns`.
    pub rows: Vec<Vec<JsonValue>>,
}

impl TableSample {
    pub fn to_text(&self) -> String {
        let columns: Vec<ColumnInfo> = self.columns.iter().map(ColumnInfo::new).collect();
        format_as_tsv(&columns, &self.rows)
    }
}

/// Textual snapshot of a database's tables, recomputed for every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDescription(String);

impl SchemaDescription {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Join the description of every table, separated by a blank line.
    pub fn from_tables(tables: &[TableSchema]) -> Self {
        Self(
            tables
                .iter()
                .map(TableSchema::to_description)
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
