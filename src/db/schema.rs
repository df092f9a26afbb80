//! Schema introspection module.
//!
//! Builds the textual schema description embedded in both prompts: one
//! `CREATE TABLE` block per base table of the connected database, followed by
//! a few sample rows.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.

use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{InsightError, InsightResult};
use crate::models::{
    ColumnDefinition, DatabaseType, ForeignKey, SchemaDescription, TableSample, TableSchema,
};
use futures_util::{Stream, StreamExt};
use sqlx::Executor;
use tracing::{debug, warn};

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List the base tables of the connected database, sorted by name.
    pub async fn list_tables(pool: &DbPool) -> InsightResult<Vec<String>> {
        let result = match pool {
            DbPool::Postgres(p) => postgres::list_tables(p).await,
            DbPool::MySql(p) => mysql::list_tables(p).await,
            DbPool::SQLite(p) => sqlite::list_tables(p).await,
        };
        result.map_err(|e| InsightError::schema(format!("Failed to list tables: {}", e)))
    }

    /// Describe a table's columns and keys.
    pub async fn describe_table(pool: &DbPool, table_name: &str) -> InsightResult<TableSchema> {
        let result = match pool {
            DbPool::Postgres(p) => postgres::describe_table(p, table_name).await,
            DbPool::MySql(p) => mysql::describe_table(p, table_name).await,
            DbPool::SQLite(p) => sqlite::describe_table(p, table_name).await,
        };
        let table = result.map_err(|e| {
            InsightError::schema(format!("Failed to describe table '{}': {}", table_name, e))
        })?;

        if table.columns.is_empty() {
            return Err(InsightError::schema(format!(
                "Table '{}' not found",
                table_name
            )));
        }
        Ok(table)
    }

    /// Read up to `limit` rows of a table for the schema description.
    pub async fn sample_table(
        pool: &DbPool,
        table: &TableSchema,
        limit: u32,
    ) -> InsightResult<TableSample> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {}",
            quote_identifier(&table.table_name, pool.db_type()),
            limit
        );

        let rows = match pool {
            DbPool::Postgres(p) => collect_json(p.fetch(sql.as_str())).await,
            DbPool::MySql(p) => collect_json(p.fetch(sql.as_str())).await,
            DbPool::SQLite(p) => collect_json(p.fetch(sql.as_str())).await,
        }
        .map_err(|e| {
            InsightError::schema(format!(
                "Failed to sample table '{}': {}",
                table.table_name, e
            ))
        })?;

        Ok(TableSample {
            requested: limit,
            columns: table.columns.iter().map(|c| c.name.clone()).collect(),
            rows,
        })
    }

    /// Describe every base table, with up to `sample_rows` rows each.
    ///
    /// A table whose rows cannot be read is still described, just without the
    /// sample. A database without tables yields an empty description.
    pub async fn describe_database(
        pool: &DbPool,
        sample_rows: u32,
    ) -> InsightResult<SchemaDescription> {
        let names = Self::list_tables(pool).await?;
        let mut tables = Vec::with_capacity(names.len());

        for name in &names {
            let mut table = Self::describe_table(pool, name).await?;
            if sample_rows > 0 {
                match Self::sample_table(pool, &table, sample_rows).await {
                    Ok(sample) => table = table.with_sample(sample),
                    Err(e) => warn!(table = %name, error = %e, "Skipping sample rows"),
                }
            }
            tables.push(table);
        }

        debug!(tables = tables.len(), "Described database schema");
        Ok(SchemaDescription::from_tables(&tables))
    }
}

/// Quote an identifier for the given dialect, doubling embedded quote characters.
pub fn quote_identifier(name: &str, db: DatabaseType) -> String {
    match db {
        DatabaseType::MySQL => format!("`{}`", name.replace('`', "``")),
        DatabaseType::PostgreSQL | DatabaseType::SQLite => {
            format!("\"{}\"", name.replace('"', "\"\""))
        }
    }
}

/// Drain a row stream into positional JSON rows.
async fn collect_json<R, S>(mut stream: S) -> Result<Vec<Vec<serde_json::Value>>, sqlx::Error>
where
    R: RowToJson,
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    let mut rows = Vec::new();
    while let Some(row) = stream.next().await {
        rows.push(row?.to_json_values());
    }
    Ok(rows)
}

// =============================================================================
// SQL Query Templates
// =============================================================================
//
// Centralized SQL queries for schema introspection. Each database has its own
// submodule with queries adapted to its specific system catalogs.

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            c.column_name,
            format_type(a.atttypid, a.atttypmod) as column_type,
            c.is_nullable,
            c.column_default,
            CASE WHEN pk.column_name IS NOT NULL THEN true ELSE false END as is_primary_key
        FROM information_schema.columns c
        JOIN pg_class t ON t.relname = c.table_name
        JOIN pg_namespace n ON n.oid = t.relnamespace AND n.nspname = c.table_schema
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attname = c.column_name
        LEFT JOIN (
            SELECT kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_name = $1
            AND tc.table_schema = current_schema()
            AND tc.constraint_type = 'PRIMARY KEY'
        ) pk ON c.column_name = pk.column_name
        WHERE c.table_name = $1 AND c.table_schema = current_schema()
        ORDER BY c.ordinal_position
        "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            kcu.column_name,
            ccu.table_name AS foreign_table_name,
            ccu.column_name AS foreign_column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage kcu
            ON tc.constraint_name = kcu.constraint_name
            AND tc.table_schema = kcu.table_schema
        JOIN information_schema.constraint_column_usage ccu
            ON ccu.constraint_name = tc.constraint_name
            AND ccu.table_schema = tc.table_schema
        WHERE tc.table_name = $1
        AND tc.table_schema = current_schema()
        AND tc.constraint_type = 'FOREIGN KEY'
        "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
            CONVERT(IS_NULLABLE USING utf8) AS IS_NULLABLE,
            CONVERT(COLUMN_DEFAULT USING utf8) AS COLUMN_DEFAULT,
            CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY
        FROM information_schema.columns
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
        ORDER BY ORDINAL_POSITION
        "#;

        pub const DESCRIBE_FOREIGN_KEYS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(REFERENCED_TABLE_NAME USING utf8) AS REFERENCED_TABLE_NAME,
            CONVERT(REFERENCED_COLUMN_NAME USING utf8) AS REFERENCED_COLUMN_NAME
        FROM information_schema.KEY_COLUMN_USAGE
        WHERE TABLE_NAME = ?
        AND TABLE_SCHEMA = DATABASE()
        AND REFERENCED_TABLE_NAME IS NOT NULL
        "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables: Vec<String> = rows
            .iter()
            .map(|row| row.get::<String, _>("table_name"))
            .filter(|name| !name.is_empty())
            .collect();

        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn describe_table(
        pool: &PgPool,
        table_name: &str,
    ) -> Result<TableSchema, sqlx::Error> {
        let mut table = TableSchema::new(table_name);

        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;
        for row in &rows {
            let name: String = row.get("column_name");
            let column_type: String = row.get("column_type");
            let nullable: String = row.get("is_nullable");
            let default_value: Option<String> = row.try_get("column_default").ok().flatten();
            let is_pk: bool = row.get("is_primary_key");

            let mut col = ColumnDefinition::new(name, column_type, nullable == "YES")
                .with_primary_key(is_pk);
            if let Some(def) = default_value {
                col = col.with_default(def);
            }
            table = table.with_column(col);
        }

        let rows = sqlx::query(queries::postgres::DESCRIBE_FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;
        for row in &rows {
            let column: String = row.get("column_name");
            let ref_table: String = row.get("foreign_table_name");
            let ref_column: String = row.get("foreign_column_name");
            table = table.with_foreign_key(ForeignKey::new(column, ref_table, ref_column));
        }

        Ok(table)
    }
}

mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &sqlx::mysql::MySqlRow, column: &str) -> String {
        get_optional_string(row, column).unwrap_or_default()
    }

    fn get_optional_string(row: &sqlx::mysql::MySqlRow, column: &str) -> Option<String> {
        row.try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<Vec<u8>>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
    }

    pub async fn list_tables(pool: &MySqlPool) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables: Vec<String> = rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect();

        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    pub async fn describe_table(
        pool: &MySqlPool,
        table_name: &str,
    ) -> Result<TableSchema, sqlx::Error> {
        let mut table = TableSchema::new(table_name);

        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;
        for row in &rows {
            let name = get_string(row, "COLUMN_NAME");
            let column_type = get_string(row, "COLUMN_TYPE");
            let nullable = get_string(row, "IS_NULLABLE");
            let is_pk = get_string(row, "COLUMN_KEY") == "PRI";

            let mut col =
                ColumnDefinition::new(name, column_type, nullable == "YES").with_primary_key(is_pk);
            if let Some(def) = get_optional_string(row, "COLUMN_DEFAULT") {
                col = col.with_default(def);
            }
            table = table.with_column(col);
        }

        let rows = sqlx::query(queries::mysql::DESCRIBE_FOREIGN_KEYS)
            .bind(table_name)
            .fetch_all(pool)
            .await?;
        for row in &rows {
            table = table.with_foreign_key(ForeignKey::new(
                get_string(row, "COLUMN_NAME"),
                get_string(row, "REFERENCED_TABLE_NAME"),
                get_string(row, "REFERENCED_COLUMN_NAME"),
            ));
        }

        Ok(table)
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    fn pragma(name: &str, table_name: &str) -> String {
        format!("PRAGMA {}('{}')", name, table_name.replace('\'', "''"))
    }

    pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let tables: Vec<String> = rows.iter().map(|row| row.get("name")).collect();
        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    pub async fn describe_table(
        pool: &SqlitePool,
        table_name: &str,
    ) -> Result<TableSchema, sqlx::Error> {
        let mut table = TableSchema::new(table_name);

        let rows = sqlx::query(&pragma("table_info", table_name))
            .fetch_all(pool)
            .await?;
        for row in &rows {
            let name: String = row.get("name");
            let data_type: String = row.get("type");
            let notnull: i32 = row.get("notnull");
            let default_value: Option<String> = row.try_get("dflt_value").ok().flatten();
            let pk: i32 = row.get("pk");

            let mut col =
                ColumnDefinition::new(name, data_type, notnull == 0).with_primary_key(pk > 0);
            if let Some(def) = default_value {
                col = col.with_default(def);
            }
            table = table.with_column(col);
        }

        let rows = sqlx::query(&pragma("foreign_key_list", table_name))
            .fetch_all(pool)
            .await?;
        for row in &rows {
            let column: String = row.get("from");
            let ref_table: String = row.get("table");
            let ref_column: String = row.get("to");
            table = table.with_foreign_key(ForeignKey::new(column, ref_table, ref_column));
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Artist", DatabaseType::MySQL), "`Artist`");
        assert_eq!(quote_identifier("a`b", DatabaseType::MySQL), "`a``b`");
        assert_eq!(
            quote_identifier("Order Items", DatabaseType::PostgreSQL),
            "\"Order Items\""
        );
        assert_eq!(quote_identifier("x\"y", DatabaseType::SQLite), "\"x\"\"y\"");
    }
}
