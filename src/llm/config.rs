//! Completion client configuration.

use crate::config::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use std::time::Duration;
use url::Url;

#[derive(Clone)]
pub struct CompletionConfig {
    /// Base URL of the OpenAI-compatible API, e.g. `https://api.groq.com/openai/v1`.
    pub api_base: Url,
    /// Contains sensitive data - never log
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    /// Whole-request limit. `None` leaves the HTTP client's default (no limit).
    pub request_timeout: Option<Duration>,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_base", &self.api_base.as_str())
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl CompletionConfig {
    /// Configuration with the default endpoint, model and temperature.
    pub fn new(api_base: Url, api_key: impl Into<String>) -> Self {
        Self {
            api_base,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Full URL of the chat-completions endpoint.
    ///
    /// The base path is kept even when it lacks a trailing slash.
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.api_base.as_str().trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_API_BASE;

    fn default_base() -> Url {
        Url::parse(DEFAULT_API_BASE).unwrap()
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = CompletionConfig::new(default_base(), "gsk_secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_completions_url_keeps_base_path() {
        let config = CompletionConfig::new(default_base(), "");
        assert_eq!(
            config.completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );

        let slashed = CompletionConfig::new(Url::parse("http://localhost:8080/v1/").unwrap(), "");
        assert_eq!(
            slashed.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn test_builder_defaults() {
        let config = CompletionConfig::new(default_base(), "k")
            .with_model("llama3-70b-8192")
            .with_temperature(0.5);
        assert_eq!(config.model, "llama3-70b-8192");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.request_timeout, None);
    }
}
