//! Single-request mode: one prompt or task in, one rendered reply out.

use anyhow::{Context, Result};
use cloudeng_core::config::Config;
use cloudeng_core::render::Renderer;
use cloudeng_core::session::ChatSession;

use super::{start_agent, terminal};
use crate::cli::AgentOptions;

/// What to send to the agent.
pub enum Request<'a> {
    Prompt(&'a str),
    Task(&'a str),
}

/// Runs one request and prints the rendered reply to stdout.
///
/// # Errors
/// Returns an error if the agent cannot be started, the task selector is
/// unknown, or stdout cannot be written. Agent failures during the request
/// are printed as the reply.
pub async fn run(request: Request<'_>, config: &Config, opts: &AgentOptions) -> Result<()> {
    let renderer = Renderer::for_dir(&config.diagram_dir).context("build diagram pattern")?;
    let (agent, servers) = start_agent(config, opts).await?;
    let mut session = ChatSession::new(agent);

    let reply = match request {
        Request::Prompt(prompt) => Ok(session.submit(prompt).await),
        Request::Task(selector) => session.run_task(selector).await.map(|(_, reply)| reply),
    };
    servers.shutdown().await;

    terminal::print_content(&renderer, &reply?).context("write reply")
}
