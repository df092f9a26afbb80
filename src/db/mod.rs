//! Database layer.
//!
//! This module contains database-related functionality including:
//! - Connection handling
//! - Query execution
//! - Schema introspection
//! - Type mappings

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{Connection, DbPool};
pub use schema::SchemaInspector;
