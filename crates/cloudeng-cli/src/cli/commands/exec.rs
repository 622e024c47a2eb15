//! Exec command handler.

use anyhow::{Result, bail};
use cloudeng_core::config;

use crate::cli::AgentOptions;
use crate::modes::oneshot::{self, Request};

pub async fn run(prompt: &str, config: &config::Config, opts: &AgentOptions) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        bail!("Prompt is empty");
    }
    oneshot::run(Request::Prompt(prompt), config, opts).await
}
