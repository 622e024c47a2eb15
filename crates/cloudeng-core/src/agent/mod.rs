//! Agent invocation boundary.
//!
//! The host hands a natural-language task to an [`AgentInvoker`] and gets a
//! [`RawAgentResult`] back. The result shape is deliberately loose: callers
//! run it through [`crate::normalize::normalize`] before display.

mod runner;

use std::borrow::Cow;
use std::fmt;
use std::future::Future;

use anyhow::Result;
pub use runner::CloudAgent;

use crate::normalize::literal::quote_str;
use crate::tasks;

/// Raw value produced by one agent invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAgentResult {
    /// The agent produced nothing.
    Absent,
    /// Plain text (also used for error text).
    Text(String),
    /// The agent's structured final message.
    Message(AgentMessage),
    /// Undecoded output, e.g. from a subprocess.
    Bytes(Vec<u8>),
}

impl RawAgentResult {
    /// Best-effort conversion to text. `Ok(None)` means there is nothing to
    /// show.
    ///
    /// # Errors
    /// Returns an error when byte output is not valid UTF-8.
    pub fn to_text(&self) -> Result<Option<Cow<'_, str>>, std::str::Utf8Error> {
        match self {
            RawAgentResult::Absent => Ok(None),
            RawAgentResult::Text(text) => Ok(Some(Cow::Borrowed(text))),
            RawAgentResult::Message(message) => Ok(Some(Cow::Owned(message.to_string()))),
            RawAgentResult::Bytes(bytes) => std::str::from_utf8(bytes).map(|s| Some(Cow::Borrowed(s))),
        }
    }
}

impl From<String> for RawAgentResult {
    fn from(text: String) -> Self {
        RawAgentResult::Text(text)
    }
}

/// One content block of an agent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlock {
    pub text: String,
}

/// Final message returned by the agent.
///
/// `Display` prints it in literal form, which is what ends up in front of the
/// normalizer when a runtime stringifies the message object:
/// `{'role': 'assistant', 'content': [{'text': '...'}]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMessage {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl AgentMessage {
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: vec![ContentBlock { text: text.into() }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.iter().all(|block| block.text.is_empty())
    }
}

impl fmt::Display for AgentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{'role': {}, 'content': [", quote_str(&self.role))?;
        for (i, block) in self.content.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{{'text': {}}}", quote_str(&block.text))?;
        }
        write!(f, "]}}")
    }
}

/// Something that can run a natural-language task.
pub trait AgentInvoker {
    /// Runs one task and returns the raw result.
    fn invoke(&self, task: &str) -> impl Future<Output = Result<RawAgentResult>> + Send;

    /// Forgets conversation state kept between invocations, if any.
    fn reset(&self) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}

/// Runs a free-form task. Invocation errors become error text so the
/// transcript always gets a reply.
pub async fn execute_custom_task<A: AgentInvoker>(agent: &A, description: &str) -> RawAgentResult {
    match agent.invoke(description).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "agent invocation failed");
            RawAgentResult::Text(format!("Error executing task: {e:#}"))
        }
    }
}

/// Runs a predefined task by key.
pub async fn execute_predefined_task<A: AgentInvoker>(agent: &A, key: &str) -> RawAgentResult {
    let Some(task) = tasks::find(key) else {
        return RawAgentResult::Text(format!(
            "Error: Task '{key}' not found in predefined tasks."
        ));
    };
    execute_custom_task(agent, task.description).await
}
