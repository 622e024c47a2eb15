//! Chat command handler.

use std::io;

use anyhow::{Context, Result};
use cloudeng_core::config;
use cloudeng_core::render::Renderer;
use cloudeng_core::session::ChatSession;
use tokio::io::BufReader;

use crate::cli::AgentOptions;
use crate::modes::{self, repl, terminal};

pub async fn run(config: &config::Config, opts: &AgentOptions) -> Result<()> {
    let renderer = Renderer::for_dir(&config.diagram_dir).context("build diagram pattern")?;
    let (agent, servers) = modes::start_agent(config, opts).await?;
    let mut session = ChatSession::new(agent);

    let result = repl::run(
        &mut session,
        &renderer,
        BufReader::new(tokio::io::stdin()),
        &mut io::stdout(),
        terminal::stdout_styled(),
    )
    .await;

    servers.shutdown().await;
    result.context("interactive chat failed")
}
