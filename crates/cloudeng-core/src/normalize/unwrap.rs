//! Strategies for pulling the human-readable payload out of a printed
//! message wrapper.
//!
//! Each strategy returns `Some(text)` on success; [`UNWRAP_STRATEGIES`] is
//! tried in order and the first hit wins.

use std::sync::LazyLock;

use regex::Regex;

use super::literal::{self, LiteralValue};

/// A named extraction step.
pub struct UnwrapStrategy {
    pub name: &'static str,
    pub extract: fn(&str) -> Option<String>,
}

/// Ordered from most to least precise.
pub const UNWRAP_STRATEGIES: &[UnwrapStrategy] = &[
    UnwrapStrategy {
        name: "literal",
        extract: from_literal,
    },
    UnwrapStrategy {
        name: "text_field_regex",
        extract: from_text_field_regex,
    },
];

/// Runs the strategies in order, returning the first extracted payload and
/// the name of the strategy that produced it.
pub fn unwrap_payload(text: &str) -> Option<(&'static str, String)> {
    UNWRAP_STRATEGIES
        .iter()
        .find_map(|strategy| (strategy.extract)(text).map(|payload| (strategy.name, payload)))
}

/// Parses the whole text as a literal mapping and returns the `text` field of
/// the first mapping inside its `content` sequence that has one.
pub fn from_literal(text: &str) -> Option<String> {
    let value = match literal::parse(text.trim()) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "wrapper did not parse as a literal");
            return None;
        }
    };

    value
        .get("content")?
        .as_sequence()?
        .iter()
        .filter(|item| item.as_dict().is_some())
        .find_map(|item| item.get("text"))
        .map(literal_to_text)
}

/// Text of a payload field. Non-string payloads are printed back in literal
/// form.
fn literal_to_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Str(s) => s.clone(),
        other => print_literal(other),
    }
}

fn print_literal(value: &LiteralValue) -> String {
    fn join(items: &[LiteralValue]) -> String {
        items.iter().map(print_literal).collect::<Vec<_>>().join(", ")
    }

    match value {
        LiteralValue::None => "None".to_string(),
        LiteralValue::Bool(true) => "True".to_string(),
        LiteralValue::Bool(false) => "False".to_string(),
        LiteralValue::Int(n) => n.to_string(),
        LiteralValue::Float(f) => format!("{f:?}"),
        LiteralValue::Str(s) => literal::quote_str(s),
        LiteralValue::Bytes(b) => format!("b{}", literal::quote_str(&String::from_utf8_lossy(b))),
        LiteralValue::List(items) => format!("[{}]", join(items)),
        LiteralValue::Tuple(items) if items.len() == 1 => format!("({},)", join(items)),
        LiteralValue::Tuple(items) => format!("({})", join(items)),
        LiteralValue::Set(items) => format!("{{{}}}", join(items)),
        LiteralValue::Dict(pairs) => {
            let body = pairs
                .iter()
                .map(|(k, v)| format!("{}: {}", print_literal(k), print_literal(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{body}}}")
        }
    }
}

static TEXT_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)'text':\s*'(.+?)(?:'\}\]|\})").expect("valid regex")
});

/// Best-effort scrape of the first single-quoted `'text': '...'` field.
///
/// Only understands single-quoted wrappers; embedded quotes or double-quoted
/// values will not match.
pub fn from_text_field_regex(text: &str) -> Option<String> {
    let captured = TEXT_FIELD_RE.captures(text)?.get(1)?.as_str();
    Some(
        captured
            .replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\'", "'")
            .replace("\\\"", "\""),
    )
}
