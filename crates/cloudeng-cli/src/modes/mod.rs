//! Runtime execution modes.
//!
//! - `oneshot`: run a single request and print the rendered reply
//! - `repl`: line-based interactive chat
//! - `terminal`: stdout rendering shared by both
//! - `kitty`: inline diagram previews for capable terminals

pub mod kitty;
pub mod oneshot;
pub mod repl;
pub mod terminal;

use anyhow::{Context, Result};
use cloudeng_core::agent::CloudAgent;
use cloudeng_core::config::Config;
use cloudeng_core::mcp::ToolServers;
use cloudeng_core::tools::ToolRegistry;

use crate::cli::AgentOptions;

/// Starts the configured tool servers and builds the agent on top of them.
///
/// The returned servers must be shut down by the caller once the agent is no
/// longer used.
pub async fn start_agent(config: &Config, opts: &AgentOptions) -> Result<(CloudAgent, ToolServers)> {
    let system_prompt = config
        .effective_system_prompt()
        .context("resolve system prompt")?;

    let servers = if opts.tool_servers {
        ToolServers::start(&config.tool_servers.servers).await?
    } else {
        tracing::info!("tool servers disabled");
        ToolServers::empty()
    };

    let mut registry = ToolRegistry::builtins();
    servers.register_tools(&mut registry);
    tracing::info!(tools = ?registry.tool_names(), "tool registry ready");

    match CloudAgent::from_config(config, registry, system_prompt) {
        Ok(agent) => Ok((agent, servers)),
        Err(e) => {
            servers.shutdown().await;
            Err(e.context("create agent"))
        }
    }
}
