//! OpenAI-compatible chat-completions client: request building and response parsing.

use super::CompletionService;
use super::config::CompletionConfig;
use crate::error::{InsightError, InsightResult};
use tracing::debug;

const STAGE: &str = "completion";

/// Completion client for Groq and other OpenAI-compatible endpoints.
pub struct CompletionClient {
    config: CompletionConfig,
    http: reqwest::Client,
}

impl CompletionClient {
    /// Build a client. No timeout is applied unless the config sets one.
    pub fn new(config: CompletionConfig) -> InsightResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| InsightError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Build the JSON request body: one user message, no system prompt.
    pub(crate) fn build_request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ]
        })
    }

    /// Extract `choices[0].message.content`.
    pub(crate) fn parse_response(json: &serde_json::Value) -> InsightResult<String> {
        if let Some(message) = json["error"]["message"].as_str() {
            return Err(InsightError::synthesis(STAGE, message));
        }

        let first = json["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .ok_or_else(|| InsightError::synthesis(STAGE, "no choices in response"))?;

        first["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| InsightError::synthesis(STAGE, "response has no message content"))
    }
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("config", &self.config)
            .finish()
    }
}

impl CompletionService for CompletionClient {
    async fn complete(&self, prompt: &str) -> InsightResult<String> {
        let body = self.build_request_body(prompt);
        let url = self.config.completions_url();

        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Completion request"
        );

        let mut request = self.http.post(&url).json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(InsightError::synthesis(
                STAGE,
                format!("HTTP {status}: {text}"),
            ));
        }

        let json: serde_json::Value = response.json().await?;
        let content = Self::parse_response(&json)?;

        debug!(reply_chars = content.len(), "Completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use url::Url;

    fn client_for(base: &str, key: &str) -> CompletionClient {
        CompletionClient::new(CompletionConfig::new(Url::parse(base).unwrap(), key)).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let client = client_for("https://api.groq.com/openai/v1", "k");
        let body = client.build_request_body("How many artists?");
        assert_eq!(body["model"], "mixtral-8x7b-32768");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "How many artists?");
    }

    #[test]
    fn test_parse_response_content() {
        let json = json!({
            "choices": [{ "message": { "role": "assistant", "content": "SELECT 1;" } }]
        });
        assert_eq!(CompletionClient::parse_response(&json).unwrap(), "SELECT 1;");
    }

    #[test]
    fn test_parse_response_keeps_whitespace() {
        let json = json!({ "choices": [{ "message": { "content": "  SELECT 1;\n" } }] });
        assert_eq!(
            CompletionClient::parse_response(&json).unwrap(),
            "  SELECT 1;\n"
        );
    }

    #[test]
    fn test_parse_response_missing_content() {
        let err = CompletionClient::parse_response(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, InsightError::Synthesis { .. }));

        let err =
            CompletionClient::parse_response(&json!({ "choices": [{ "message": {} }] }))
                .unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }

    #[test]
    fn test_parse_response_api_error() {
        let json = json!({ "error": { "message": "Invalid API Key" } });
        let err = CompletionClient::parse_response(&json).unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = client_for("https://api.groq.com/openai/v1", "gsk_secret");
        assert!(!format!("{:?}", client).contains("gsk_secret"));
    }

    /// Serve one HTTP exchange and hand back the raw request text.
    async fn serve_once(
        status_line: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        serve_after(Duration::ZERO, status_line, body).await
    }

    /// Like `serve_once`, but waits `delay` before answering.
    async fn serve_after(
        delay: Duration,
        status_line: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/openai/v1", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            tokio::time::sleep(delay).await;
            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (base, handle)
    }

    #[tokio::test]
    async fn test_complete_round_trip() {
        let body = json!({
            "choices": [{ "message": { "content": "SELECT COUNT(*) FROM Artist;" } }]
        });
        let (base, server) = serve_once("HTTP/1.1 200 OK", body.to_string()).await;

        let client = client_for(&base, "gsk_test");
        let reply = client.complete("How many artists?").await.unwrap();
        assert_eq!(reply, "SELECT COUNT(*) FROM Artist;");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /openai/v1/chat/completions"));
        assert!(
            request
                .to_ascii_lowercase()
                .contains("authorization: bearer gsk_test")
        );
        assert!(request.contains("How many artists?"));
    }

    #[tokio::test]
    async fn test_complete_http_error_is_synthesis_error() {
        let body = json!({ "error": { "message": "rate limited" } });
        let (base, server) = serve_once("HTTP/1.1 429 Too Many Requests", body.to_string()).await;

        let client = client_for(&base, "");
        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, InsightError::Synthesis { .. }));
        assert!(err.to_string().contains("429"));

        let request = server.await.unwrap();
        assert!(!request.to_ascii_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn test_slow_reply_is_awaited_by_default() {
        let body = json!({ "choices": [{ "message": { "content": "SELECT 1;" } }] });
        let (base, server) =
            serve_after(Duration::from_millis(300), "HTTP/1.1 200 OK", body.to_string()).await;

        let client = client_for(&base, "k");
        assert_eq!(client.complete("slow").await.unwrap(), "SELECT 1;");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_configured_timeout_is_synthesis_error() {
        let body = json!({ "choices": [{ "message": { "content": "SELECT 1;" } }] });
        let (base, _server) =
            serve_after(Duration::from_secs(5), "HTTP/1.1 200 OK", body.to_string()).await;

        let config = CompletionConfig::new(Url::parse(&base).unwrap(), "k")
            .with_request_timeout(Duration::from_millis(100));
        let client = CompletionClient::new(config).unwrap();
        let err = client.complete("slow").await.unwrap_err();
        assert!(matches!(err, InsightError::Synthesis { .. }));
        assert!(err.to_string().contains("timed out"));
    }
}
