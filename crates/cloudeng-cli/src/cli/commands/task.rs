//! Task command handler.

use anyhow::{Result, bail};
use cloudeng_core::{config, tasks};

use crate::cli::AgentOptions;
use crate::modes::oneshot::{self, Request};

pub async fn run(selector: &str, config: &config::Config, opts: &AgentOptions) -> Result<()> {
    // Reject unknown tasks before any tool server is spawned.
    if tasks::resolve(selector).is_none() {
        bail!("Unknown task '{selector}'. Run `cloudeng tasks` to list the available tasks.");
    }
    oneshot::run(Request::Task(selector), config, opts).await
}
