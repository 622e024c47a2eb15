//! Model provider client and shared error types.

pub mod anthropic;

use std::fmt;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolves an API key with precedence: config > env.
///
/// # Errors
/// Returns an error if neither source provides a key.
pub fn resolve_api_key(
    config_api_key: Option<&str>,
    env_var: &str,
    config_section: &str,
) -> Result<String> {
    if let Some(key) = config_api_key {
        let trimmed = key.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .with_context(|| {
            format!("No API key available. Set {env_var} or api_key in [providers.{config_section}].")
        })
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    provider_name: &str,
) -> Result<String> {
    let env_url = std::env::var(env_var).ok();
    let candidates = [env_url.as_deref(), config_base_url];
    for candidate in candidates.into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, provider_name)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }
    Ok(default_url.to_string())
}

fn validate_url(url: &str, provider_name: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {provider_name} base URL: {url}"))?;
    Ok(())
}

/// Categories of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// HTTP status error (4xx, 5xx) or transport failure
    HttpStatus,
    /// Connection or request timeout
    Timeout,
    /// Response body did not parse
    Parse,
    /// Error object returned by the API
    ApiError,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::HttpStatus => write!(f, "http_status"),
            ProviderErrorKind::Timeout => write!(f, "timeout"),
            ProviderErrorKind::Parse => write!(f, "parse"),
            ProviderErrorKind::ApiError => write!(f, "api_error"),
        }
    }
}

/// Structured error from the provider with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// HTTP status error; pulls `error.message` out of a JSON body when present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let details = (!body.is_empty()).then(|| body.to_string());
        let message = match api_error_message(body) {
            Some((_, msg)) => format!("HTTP {status}: {msg}"),
            None => format!("HTTP {status}"),
        };
        Self {
            kind: ProviderErrorKind::HttpStatus,
            message,
            details,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn parse(message: impl Into<String>, body: &str) -> Self {
        Self {
            kind: ProviderErrorKind::Parse,
            message: message.into(),
            details: Some(body.to_string()),
        }
    }

    pub fn api_error(error_type: &str, message: &str) -> Self {
        Self::new(ProviderErrorKind::ApiError, format!("{error_type}: {message}"))
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// `(type, message)` of an `{"error": {"type": ..., "message": ...}}` body.
fn api_error_message(body: &str) -> Option<(String, String)> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;
    let message = error.get("message")?.as_str()?.to_string();
    let kind = error
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("error")
        .to_string();
    Some((kind, message))
}

/// Classifies a reqwest error into a `ProviderError`.
pub fn classify_reqwest_error(e: &reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ProviderError::timeout(format!("Connection failed: {e}"))
    } else if e.is_request() {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Request error: {e}"))
    } else {
        ProviderError::new(ProviderErrorKind::HttpStatus, format!("Network error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET_VAR: &str = "CLOUDENG_TEST_VAR_THAT_IS_NEVER_SET";

    #[test]
    fn test_api_key_prefers_config() {
        let key = resolve_api_key(Some("  sk-config  "), UNSET_VAR, "anthropic").unwrap();
        assert_eq!(key, "sk-config");
    }

    #[test]
    fn test_missing_api_key_names_both_sources() {
        let err = resolve_api_key(Some(" "), UNSET_VAR, "anthropic").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(UNSET_VAR));
        assert!(msg.contains("[providers.anthropic]"));
    }

    #[test]
    fn test_base_url_from_config_or_default() {
        assert_eq!(
            resolve_base_url(Some("http://localhost:8080/"), UNSET_VAR, "https://d", "Test").unwrap(),
            "http://localhost:8080"
        );
        assert_eq!(
            resolve_base_url(None, UNSET_VAR, "https://d", "Test").unwrap(),
            "https://d"
        );
        assert!(resolve_base_url(Some("not a url"), UNSET_VAR, "https://d", "Test").is_err());
    }

    #[test]
    fn test_http_status_extracts_api_message() {
        let err = ProviderError::http_status(
            429,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        );
        assert_eq!(err.kind, ProviderErrorKind::HttpStatus);
        assert_eq!(err.to_string(), "HTTP 429: slow down");
        assert!(err.details.is_some());

        let plain = ProviderError::http_status(502, "");
        assert_eq!(plain.to_string(), "HTTP 502");
        assert!(plain.details.is_none());
    }
}
