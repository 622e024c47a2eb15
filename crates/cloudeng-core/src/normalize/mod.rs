//! Response normalization.
//!
//! Turns whatever the agent handed back into display-ready markdown:
//!
//! 1. absent/empty results become `""`;
//! 2. non-text results are converted to text (or a fixed error string);
//! 3. `<thinking>...</thinking>` blocks are removed;
//! 4. printed message wrappers (`{'role': 'assistant', 'content': [...]}`)
//!    are unwrapped to their `text` payload;
//! 5. anything else is returned trimmed.
//!
//! Nothing here fails: every path produces a string.

pub mod literal;
pub mod unwrap;

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::agent::RawAgentResult;

/// Returned when a raw result cannot be turned into text.
pub const CONVERSION_ERROR_TEXT: &str = "Error: could not convert response to string";

static REASONING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<thinking>.*?</thinking>").expect("valid regex"));

static ASSISTANT_ROLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'role'\s*:\s*'assistant'").expect("valid regex"));

/// Normalizes a raw agent result into display text.
pub fn normalize(raw: &RawAgentResult) -> String {
    match raw.to_text() {
        Ok(Some(text)) => normalize_text(&text),
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!(error = %e, "agent result is not convertible to text");
            CONVERSION_ERROR_TEXT.to_string()
        }
    }
}

/// Normalizes response text.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let cleaned = strip_reasoning(text);

    if looks_like_wrapper(&cleaned) {
        if let Some((strategy, payload)) = unwrap::unwrap_payload(&cleaned) {
            tracing::debug!(strategy, "unwrapped printed message wrapper");
            return payload;
        }
        tracing::debug!("wrapper markers present but no strategy extracted a payload");
    }

    cleaned.trim().to_string()
}

/// Removes every `<thinking>...</thinking>` block (non-greedy, spans lines).
pub fn strip_reasoning(text: &str) -> Cow<'_, str> {
    REASONING_RE.replace_all(text, "")
}

/// Substring heuristic for a printed message wrapper: an assistant role
/// entry, a `'content'` key and a `'text'` key must all be present.
pub fn looks_like_wrapper(text: &str) -> bool {
    ASSISTANT_ROLE_RE.is_match(text) && text.contains("'content'") && text.contains("'text'")
}
