//! Tool-using agent backed by the Messages API.

use anyhow::{Result, bail};
use tokio::sync::Mutex;

use super::{AgentInvoker, AgentMessage, RawAgentResult};
use crate::config::Config;
use crate::providers::anthropic::{AnthropicClient, AnthropicConfig, ApiMessage, ContentBlock};
use crate::tools::{ToolContext, ToolRegistry};

/// The concrete agent: model client, tools and a conversation that persists
/// across requests for the life of the value.
pub struct CloudAgent {
    client: AnthropicClient,
    tools: ToolRegistry,
    tool_ctx: ToolContext,
    system_prompt: String,
    max_turns: u32,
    history: Mutex<Vec<ApiMessage>>,
}

impl CloudAgent {
    pub fn new(
        client: AnthropicClient,
        tools: ToolRegistry,
        tool_ctx: ToolContext,
        system_prompt: impl Into<String>,
        max_turns: u32,
    ) -> Self {
        Self {
            client,
            tools,
            tool_ctx,
            system_prompt: system_prompt.into(),
            max_turns: max_turns.max(1),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Builds the agent from configuration and an assembled tool registry.
    ///
    /// # Errors
    /// Returns an error when provider credentials are missing or invalid.
    pub fn from_config(config: &Config, tools: ToolRegistry, system_prompt: String) -> Result<Self> {
        let anthropic = &config.providers.anthropic;
        let client = AnthropicClient::new(AnthropicConfig::from_env(
            config.model.clone(),
            config.max_tokens,
            config.temperature,
            anthropic.base_url.as_deref(),
            anthropic.api_key.as_deref(),
        )?);
        Ok(Self::new(
            client,
            tools,
            ToolContext::from_config(config),
            system_prompt,
            config.max_turns,
        ))
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    /// Runs one request to completion. On failure the conversation is rolled
    /// back to where it was before the request.
    async fn run(&self, task: &str) -> Result<AgentMessage> {
        let mut history = self.history.lock().await;
        let checkpoint = history.len();
        history.push(ApiMessage::user_text(task));

        let outcome = self.drive(&mut history).await;
        match &outcome {
            Ok(message) if message.is_empty() => history.truncate(checkpoint),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "agent request failed, rolling back");
                history.truncate(checkpoint);
            }
        }
        outcome
    }

    async fn drive(&self, history: &mut Vec<ApiMessage>) -> Result<AgentMessage> {
        for turn in 1..=self.max_turns {
            let response = self
                .client
                .send_messages(history, self.tools.definitions(), Some(&self.system_prompt))
                .await?;

            let tool_uses = response.tool_uses();
            let blocks: Vec<ContentBlock> = response
                .content
                .into_iter()
                .filter(|block| !matches!(block, ContentBlock::Unsupported))
                .collect();

            if tool_uses.is_empty() {
                let text = blocks
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                if !text.is_empty() {
                    history.push(ApiMessage::assistant(blocks));
                }
                tracing::info!(turn, "agent finished");
                return Ok(AgentMessage::assistant_text(text));
            }

            history.push(ApiMessage::assistant(blocks));

            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, input) in tool_uses {
                tracing::info!(turn, tool = %name, "executing tool");
                let output = self.tools.execute(&name, &input, &self.tool_ctx).await;
                if !output.is_ok() {
                    tracing::warn!(tool = %name, error = ?output.error(), "tool failed");
                }
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: output.to_json_string(),
                    is_error: !output.is_ok(),
                });
            }
            history.push(ApiMessage::tool_results(results));
        }

        bail!(
            "Agent stopped after {} turns without a final answer",
            self.max_turns
        )
    }
}

impl AgentInvoker for CloudAgent {
    async fn invoke(&self, task: &str) -> Result<RawAgentResult> {
        let message = self.run(task).await?;
        if message.is_empty() {
            return Ok(RawAgentResult::Absent);
        }
        Ok(RawAgentResult::Message(message))
    }

    async fn reset(&self) {
        self.history.lock().await.clear();
    }
}
