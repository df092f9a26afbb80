//! Configuration handling for SQLInsight.
//!
//! This module provides configuration management via CLI arguments and environment variables.
//! Database settings double as the initial values of the session's settings form.

use crate::error::{InsightError, InsightResult};
use crate::llm::CompletionConfig;
use crate::models::{ConnectionSettings, DatabaseType};
use clap::Parser;
use url::Url;

pub const DEFAULT_DB_SCHEME: &str = "mysql";
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 3306;
pub const DEFAULT_DB_USER: &str = "root";
pub const DEFAULT_DB_PASSWORD: &str = "passcode";
pub const DEFAULT_DB_NAME: &str = "RestaurantMenu";

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "mixtral-8x7b-32768";
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
/// Read by clap for `--api-key`.
pub const API_KEY_ENV: &str = "SQLINSIGHT_API_KEY";
/// Consulted when neither `--api-key` nor [`API_KEY_ENV`] is set.
pub const API_KEY_FALLBACK_ENV: &str = "GROQ_API_KEY";

/// Rows kept from a query result before it is rendered for the answer prompt.
pub const DEFAULT_MAX_ROWS: u32 = 100;
pub const MAX_ROWS_LIMIT: u32 = 10000;

/// Sample rows per table embedded in the schema description.
pub const DEFAULT_SAMPLE_ROWS: u32 = 3;

/// Configuration for SQLInsight.
#[derive(Clone, Parser)]
#[command(
    name = "sql-insight",
    about = "Chat with a SQL database: ask questions in plain language, get answers in plain language",
    version,
    author
)]
pub struct Config {
    /// Database driver scheme (mysql, postgres, sqlite)
    #[arg(long, default_value = DEFAULT_DB_SCHEME, env = "SQLINSIGHT_DB_SCHEME")]
    pub scheme: String,

    /// Database host
    #[arg(long, default_value = DEFAULT_DB_HOST, env = "SQLINSIGHT_DB_HOST")]
    pub host: String,

    /// Database port
    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "SQLINSIGHT_DB_PORT")]
    pub port: u16,

    /// Database user
    #[arg(long, default_value = DEFAULT_DB_USER, env = "SQLINSIGHT_DB_USER")]
    pub user: String,

    /// Database password
    #[arg(
        long,
        default_value = DEFAULT_DB_PASSWORD,
        env = "SQLINSIGHT_DB_PASSWORD",
        hide_env_values = true
    )]
    pub password: String,

    /// Database name (file path for sqlite)
    #[arg(long, default_value = DEFAULT_DB_NAME, env = "SQLINSIGHT_DB_NAME")]
    pub database: String,

    /// Connect to the database on startup instead of waiting for /connect
    #[arg(long, env = "SQLINSIGHT_CONNECT")]
    pub connect: bool,

    /// Base URL of the OpenAI-compatible completion API
    #[arg(long, default_value = DEFAULT_API_BASE, env = "SQLINSIGHT_API_BASE")]
    pub api_base: String,

    /// API key for the completion service (falls back to GROQ_API_KEY)
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model identifier sent with every completion request
    #[arg(long, default_value = DEFAULT_MODEL, env = "SQLINSIGHT_MODEL")]
    pub model: String,

    /// Sampling temperature. Both prompts run at 0 unless overridden
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, env = "SQLINSIGHT_TEMPERATURE")]
    pub temperature: f32,

    /// Maximum rows of a query result passed to the answer prompt
    #[arg(long, default_value_t = DEFAULT_MAX_ROWS, env = "SQLINSIGHT_MAX_ROWS")]
    pub max_rows: u32,

    /// Sample rows per table included in the schema description
    #[arg(long, default_value_t = DEFAULT_SAMPLE_ROWS, env = "SQLINSIGHT_SAMPLE_ROWS")]
    pub sample_rows: u32,

    /// Parse synthesized SQL before running it; parse errors are narrated like query errors
    #[arg(long, env = "SQLINSIGHT_CHECK_SQL")]
    pub check_sql: bool,

    /// Print the synthesized SQL before each answer
    #[arg(long, env = "SQLINSIGHT_SHOW_SQL")]
    pub show_sql: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SQLINSIGHT_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "SQLINSIGHT_JSON_LOGS")]
    pub json_logs: bool,

    /// Enable logging output on stderr (disabled by default to keep the chat readable)
    #[arg(long, env = "SQLINSIGHT_ENABLE_LOGS")]
    pub enable_logs: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("scheme", &self.scheme)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("connect", &self.connect)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_rows", &self.max_rows)
            .field("sample_rows", &self.sample_rows)
            .field("check_sql", &self.check_sql)
            .field("show_sql", &self.show_sql)
            .field("log_level", &self.log_level)
            .field("json_logs", &self.json_logs)
            .field("enable_logs", &self.enable_logs)
            .finish()
    }
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        let mut config = Self::parse();
        config.apply_api_key_fallback(|name| std::env::var(name).ok());
        config
    }

    /// Fill a missing API key from [`API_KEY_FALLBACK_ENV`].
    fn apply_api_key_fallback(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup(API_KEY_FALLBACK_ENV);
        }
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            scheme: DEFAULT_DB_SCHEME.to_string(),
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            user: DEFAULT_DB_USER.to_string(),
            password: DEFAULT_DB_PASSWORD.to_string(),
            database: DEFAULT_DB_NAME.to_string(),
            connect: false,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_rows: DEFAULT_MAX_ROWS,
            sample_rows: DEFAULT_SAMPLE_ROWS,
            check_sql: false,
            show_sql: false,
            log_level: "info".to_string(),
            json_logs: false,
            enable_logs: false,
        }
    }

    /// Build the initial connection settings from the database arguments.
    pub fn connection_settings(&self) -> InsightResult<ConnectionSettings> {
        let db_type = DatabaseType::from_scheme(&self.scheme).ok_or_else(|| {
            InsightError::invalid_input(format!(
                "Unsupported database scheme '{}'. Use mysql, postgres or sqlite.",
                self.scheme
            ))
        })?;

        Ok(ConnectionSettings {
            db_type,
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        })
    }

    /// Build the completion client configuration.
    pub fn completion_config(&self) -> InsightResult<CompletionConfig> {
        let api_base = Url::parse(&self.api_base).map_err(|e| {
            InsightError::invalid_input(format!("Invalid API base URL '{}': {}", self.api_base, e))
        })?;

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(InsightError::invalid_input(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }

        Ok(CompletionConfig {
            api_base,
            api_key: self.api_key.clone().unwrap_or_default(),
            model: self.model.clone(),
            temperature: self.temperature,
            request_timeout: None,
        })
    }

    /// Row cap for query results, clamped to `[1, MAX_ROWS_LIMIT]`.
    pub fn effective_max_rows(&self) -> u32 {
        self.max_rows.clamp(1, MAX_ROWS_LIMIT)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_settings_form() {
        let config = Config::default();
        let settings = config.connection_settings().unwrap();
        assert_eq!(settings.db_type, DatabaseType::MySQL);
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 3306);
        assert_eq!(settings.user, "root");
        assert_eq!(settings.database, "RestaurantMenu");
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let config = Config {
            scheme: "oracle".to_string(),
            ..Config::default()
        };
        let err = config.connection_settings().unwrap_err();
        assert!(matches!(err, InsightError::InvalidInput { .. }));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_completion_config_defaults() {
        let config = Config::default();
        let completion = config.completion_config().unwrap();
        assert_eq!(completion.model, DEFAULT_MODEL);
        assert_eq!(completion.temperature, 0.0);
        assert_eq!(completion.api_base.as_str(), "https://api.groq.com/openai/v1");
        assert!(completion.api_key.is_empty());
    }

    #[test]
    fn test_api_key_falls_back_to_groq_env() {
        let lookup = |name: &str| (name == API_KEY_FALLBACK_ENV).then(|| "gsk_groq".to_string());

        let mut config = Config::default();
        config.apply_api_key_fallback(lookup);
        assert_eq!(config.api_key.as_deref(), Some("gsk_groq"));

        let mut config = Config {
            api_key: Some("sk_explicit".to_string()),
            ..Config::default()
        };
        config.apply_api_key_fallback(lookup);
        assert_eq!(config.api_key.as_deref(), Some("sk_explicit"));

        let mut config = Config::default();
        config.apply_api_key_fallback(|_| None);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_api_key_from_flag() {
        let config =
            Config::try_parse_from(["sql-insight", "--api-key", "sk_flag", "--temperature", "0.5"])
                .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk_flag"));
        let completion = config.completion_config().unwrap();
        assert_eq!(completion.api_key, "sk_flag");
        assert_eq!(completion.temperature, 0.5);
    }

    #[test]
    fn test_invalid_api_base_rejected() {
        let config = Config {
            api_base: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.completion_config().is_err());
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let config = Config {
            temperature: 3.5,
            ..Config::default()
        };
        let err = config.completion_config().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_max_rows_clamped() {
        let zero = Config {
            max_rows: 0,
            ..Config::default()
        };
        assert_eq!(zero.effective_max_rows(), 1);

        let huge = Config {
            max_rows: 99999,
            ..Config::default()
        };
        assert_eq!(huge.effective_max_rows(), MAX_ROWS_LIMIT);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config {
            password: "hunter2".to_string(),
            api_key: Some("gsk_secret".to_string()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_from_args() {
        let config = Config::try_parse_from([
            "sql-insight",
            "--scheme",
            "postgres",
            "--port",
            "5432",
            "--database",
            "chinook",
            "--check-sql",
        ])
        .unwrap();
        let settings = config.connection_settings().unwrap();
        assert_eq!(settings.db_type, DatabaseType::PostgreSQL);
        assert_eq!(settings.port, 5432);
        assert_eq!(settings.database, "chinook");
        assert!(config.check_sql);
    }
}
