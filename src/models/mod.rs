//! Data models for SQLInsight.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod conversation;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionSettings, DatabaseType, SettingsField};
pub use conversation::{ConversationHistory, GREETING, Turn};
pub use query::{ColumnMetadata, QueryResult, SqlQuery};
pub use schema::{ColumnDefinition, ForeignKey, SchemaDescription, TableSample, TableSchema};
