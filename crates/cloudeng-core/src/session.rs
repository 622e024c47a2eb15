//! Chat session: transcript plus agent.

use anyhow::{Result, bail};

use crate::agent::{self, AgentInvoker};
use crate::normalize;
use crate::tasks::{self, PredefinedTask};
use crate::transcript::Transcript;

/// Owns the transcript and the agent for one interactive session.
pub struct ChatSession<A> {
    agent: A,
    transcript: Transcript,
}

impl<A: AgentInvoker> ChatSession<A> {
    pub fn new(agent: A) -> Self {
        Self {
            agent,
            transcript: Transcript::new(),
        }
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Records `prompt`, runs it, and records the normalized reply.
    ///
    /// Agent failures are recorded as the reply text.
    pub async fn submit(&mut self, prompt: &str) -> String {
        self.transcript.push_user(prompt);
        let raw = agent::execute_custom_task(&self.agent, prompt).await;
        self.record_reply(normalize::normalize(&raw))
    }

    /// Runs a predefined task selected by key or menu number.
    ///
    /// # Errors
    /// Returns an error when the selector names no task; nothing is recorded.
    pub async fn run_task(&mut self, selector: &str) -> Result<(&'static PredefinedTask, String)> {
        let Some(task) = tasks::resolve(selector) else {
            bail!("Unknown task '{selector}'. Use /tasks to list the available tasks.");
        };
        tracing::info!(task = task.key, "running predefined task");
        self.transcript.push_user(task.user_prompt());
        let raw = agent::execute_predefined_task(&self.agent, task.key).await;
        Ok((task, self.record_reply(normalize::normalize(&raw))))
    }

    /// Starts over: empties the transcript and resets the agent's
    /// conversation.
    pub async fn clear(&mut self) {
        self.transcript.clear();
        self.agent.reset().await;
    }

    fn record_reply(&mut self, reply: String) -> String {
        self.transcript.push_assistant(reply.clone());
        reply
    }
}
