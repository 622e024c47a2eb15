//! Anthropic Messages API client (non-streaming).

mod types;

use anyhow::Result;
use serde_json::Value;
pub use types::{ApiMessage, ContentBlock, MessagesResponse, Usage};
use types::{ApiToolDef, MessagesRequest};

use super::{
    ProviderError, ProviderResult, classify_reqwest_error, resolve_api_key, resolve_base_url,
};
use crate::tools::ToolDefinition;

/// Default base URL for the Anthropic API.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl AnthropicConfig {
    /// Creates a config, filling credentials from the environment.
    ///
    /// API key: `config_api_key`, then `ANTHROPIC_API_KEY`.
    /// Base URL: `ANTHROPIC_BASE_URL`, then `config_base_url`, then the
    /// public endpoint.
    ///
    /// # Errors
    /// Returns an error when no API key is available or the base URL is
    /// malformed.
    pub fn from_env(
        model: String,
        max_tokens: u32,
        temperature: Option<f32>,
        config_base_url: Option<&str>,
        config_api_key: Option<&str>,
    ) -> Result<Self> {
        let api_key = resolve_api_key(config_api_key, "ANTHROPIC_API_KEY", "anthropic")?;
        let base_url = resolve_base_url(
            config_base_url,
            "ANTHROPIC_BASE_URL",
            DEFAULT_BASE_URL,
            "Anthropic",
        )?;

        Ok(Self {
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
        })
    }
}

pub struct AnthropicClient {
    config: AnthropicConfig,
    http: reqwest::Client,
}

impl AnthropicClient {
    /// # Panics
    /// In test builds, panics if `base_url` is the production API.
    pub fn new(config: AnthropicConfig) -> Self {
        #[cfg(test)]
        assert!(
            config.base_url != DEFAULT_BASE_URL,
            "Tests must not use the production Anthropic API; point base_url at a mock server"
        );

        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Sends one Messages request and returns the complete response.
    ///
    /// # Errors
    /// Returns a `ProviderError` on transport failure, non-2xx status, an
    /// error body, or an unparseable response.
    pub async fn send_messages(
        &self,
        messages: &[ApiMessage],
        tools: &[ToolDefinition],
        system: Option<&str>,
    ) -> ProviderResult<MessagesResponse> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages,
            system: system.filter(|s| !s.trim().is_empty()),
            tools: tools.iter().map(ApiToolDef::from).collect(),
            temperature: self.config.temperature,
        };

        let url = format!("{}/v1/messages", self.config.base_url);
        tracing::debug!(%url, model = %self.config.model, messages = messages.len(), "sending messages request");

        let response = self
            .http
            .post(&url)
            .header("anthropic-version", API_VERSION)
            .header("x-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if !status.is_success() {
            return Err(ProviderError::http_status(status.as_u16(), &body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::parse(format!("Invalid JSON response: {e}"), &body))?;

        if value.get("type").and_then(Value::as_str) == Some("error") {
            let error = value.get("error");
            let field = |name: &str| {
                error
                    .and_then(|e| e.get(name))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string()
            };
            return Err(ProviderError::api_error(&field("type"), &field("message")));
        }

        let parsed: MessagesResponse = serde_json::from_value(value)
            .map_err(|e| ProviderError::parse(format!("Unexpected response shape: {e}"), &body))?;
        tracing::debug!(
            id = %parsed.id,
            stop_reason = parsed.stop_reason.as_deref().unwrap_or(""),
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "messages response"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::providers::ProviderErrorKind;

    fn client_for(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new(AnthropicConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            model: "claude-test".to_string(),
            max_tokens: 1024,
            temperature: Some(0.1),
        })
    }

    #[tokio::test]
    async fn test_send_messages_posts_request_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "max_tokens": 1024,
                "system": "be brief",
                "tools": [{"name": "use_aws"}],
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "content": [{"type": "text", "text": "hello"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 3, "output_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tools = crate::tools::ToolRegistry::builtins();
        let response = client_for(&server)
            .send_messages(&[ApiMessage::user_text("hi")], tools.definitions(), Some("be brief"))
            .await
            .unwrap();
        assert_eq!(response.texts(), vec!["hello".to_string()]);
        assert_eq!(response.stop_reason.as_deref(), Some("end_turn"));
    }

    #[tokio::test]
    async fn test_http_error_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": {"type": "authentication_error", "message": "invalid x-api-key"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send_messages(&[ApiMessage::user_text("hi")], &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.message, "HTTP 401: invalid x-api-key");
    }

    #[tokio::test]
    async fn test_error_body_with_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send_messages(&[ApiMessage::user_text("hi")], &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::ApiError);
        assert_eq!(err.message, "overloaded_error: Overloaded");
    }

    #[tokio::test]
    async fn test_garbage_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .send_messages(&[ApiMessage::user_text("hi")], &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Parse);
        assert_eq!(err.details.as_deref(), Some("<html>"));
    }
}
