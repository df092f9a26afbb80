//! SQLInsight Library
//!
//! Answers natural-language questions about a SQL database (SQLite, PostgreSQL,
//! MySQL): a language model writes the SQL, the query runs against the live
//! database, and the model explains the result in the context of the
//! conversation so far.

pub mod chain;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod llm;
pub mod models;
pub mod session;

pub use config::Config;
pub use error::{InsightError, InsightResult};
pub use session::Session;
