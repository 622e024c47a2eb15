//! Tool system for the agent.
//!
//! Holds the built-in tools and anything the tool servers expose, along with
//! the schema definitions sent to the model.

mod output;
pub mod use_aws;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub use output::{ToolError, ToolOutput};
use serde::Serialize;
use serde_json::Value;
pub use use_aws::AwsCliSettings;

/// Tool definition as sent to the Messages API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Context for tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// How the `aws` CLI is invoked.
    pub aws: AwsCliSettings,

    /// Optional timeout for tool execution.
    pub timeout: Option<Duration>,
}

impl ToolContext {
    pub fn new(aws: AwsCliSettings, timeout: Option<Duration>) -> Self {
        Self { aws, timeout }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(
            AwsCliSettings::from_config(&config.aws),
            config.aws.timeout(),
        )
    }
}

/// Async tool handler function.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolOutput> + Send>>;
pub type ToolHandler = Arc<dyn Fn(&Value, &ToolContext) -> ToolFuture + Send + Sync>;

/// Tool registry (definitions + executors).
#[derive(Clone, Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, ToolHandler>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("definitions", &self.definitions)
            .field("handlers_len", &self.handlers.len())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tools.
    pub fn builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            use_aws::definition(),
            Arc::new(|input, ctx| {
                let input = input.clone();
                let ctx = ctx.clone();
                Box::pin(async move { use_aws::execute(&input, &ctx).await })
            }),
        );
        registry
    }

    #[must_use]
    pub fn with_tool(mut self, definition: ToolDefinition, handler: ToolHandler) -> Self {
        self.register(definition, handler);
        self
    }

    /// Adds a tool. A tool with the same name (ignoring case) is replaced.
    pub fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        let name_lower = definition.name.to_ascii_lowercase();
        if let Some(pos) = self
            .definitions
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(&definition.name))
        {
            tracing::debug!(tool = %definition.name, "replacing tool definition");
            self.definitions.remove(pos);
        }
        self.definitions.push(definition);
        self.handlers.insert(name_lower, handler);
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.definitions.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Executes a tool by name (case-insensitive).
    ///
    /// Unknown tools produce a failure output listing what is available.
    pub async fn execute(&self, name: &str, input: &Value, ctx: &ToolContext) -> ToolOutput {
        match self.handlers.get(&name.to_ascii_lowercase()) {
            Some(handler) => handler(input, ctx).await,
            None => self.unknown_tool_output(name),
        }
    }

    fn unknown_tool_output(&self, name: &str) -> ToolOutput {
        let mut available = self.tool_names();
        available.sort();
        ToolOutput::failure_with_details(
            "unknown_tool",
            format!("Unknown tool: {name}"),
            format!("Available tools: {}", available.join(", ")),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn echo_tool(name: &str) -> (ToolDefinition, ToolHandler) {
        let definition = ToolDefinition {
            name: name.to_string(),
            description: "Echo input".to_string(),
            input_schema: json!({"type": "object"}),
        };
        let handler: ToolHandler = Arc::new(|input, _ctx| {
            let input = input.clone();
            Box::pin(async move { ToolOutput::success(input) })
        });
        (definition, handler)
    }

    fn ctx() -> ToolContext {
        ToolContext::new(AwsCliSettings::default(), None)
    }

    #[test]
    fn test_builtins_include_use_aws() {
        let registry = ToolRegistry::builtins();
        assert_eq!(registry.tool_names(), vec!["use_aws".to_string()]);
    }

    #[test]
    fn test_register_replaces_same_name_ignoring_case() {
        let (def_a, handler_a) = echo_tool("Echo");
        let (def_b, handler_b) = echo_tool("echo");
        let registry = ToolRegistry::new()
            .with_tool(def_a, handler_a)
            .with_tool(def_b, handler_b);
        assert_eq!(registry.tool_names(), vec!["echo".to_string()]);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_is_case_insensitive() {
        let (def, handler) = echo_tool("Echo");
        let registry = ToolRegistry::new().with_tool(def, handler);
        let output = registry.execute("ECHO", &json!({"x": 1}), &ctx()).await;
        assert_eq!(output.data(), Some(&json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_unknown_tool_lists_available() {
        let (def, handler) = echo_tool("echo");
        let registry = ToolRegistry::builtins().with_tool(def, handler);
        let output = registry.execute("nope", &json!({}), &ctx()).await;
        let error = output.error().unwrap();
        assert_eq!(error.code, "unknown_tool");
        assert_eq!(error.message, "Unknown tool: nope");
        assert_eq!(error.details.as_deref(), Some("Available tools: echo, use_aws"));
    }
}
