//! Structured envelope for tool outputs.
//!
//! - Success: `{"ok": true, "data": { ... }}`
//! - Failure: `{"ok": false, "error": {"code": "...", "message": "...", "details": "..."}}`
//!
//! `details` is omitted when empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Success { ok: bool, data: Value },
    Failure { ok: bool, error: ToolError },
}

/// Error details for failed tool execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolOutput {
    pub fn success(data: Value) -> Self {
        ToolOutput::Success { ok: true, data }
    }

    pub fn failure(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        ToolOutput::Failure {
            ok: false,
            error: ToolError {
                code: code.into(),
                message: message.into(),
                details,
            },
        }
    }

    pub fn failure_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self::failure(code, message, Some(details.into()))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutput::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ToolOutput::Success { data, .. } => Some(data),
            ToolOutput::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ToolError> {
        match self {
            ToolOutput::Success { .. } => None,
            ToolOutput::Failure { error, .. } => Some(error),
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"ok":false,"error":{"code":"serialize_error","message":"Failed to serialize tool output"}}"#.to_string()
        })
    }
}
