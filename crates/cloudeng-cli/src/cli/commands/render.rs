//! Render command handler.
//!
//! Normalizes a saved raw agent response and prints it the way the chat
//! would, without contacting a model.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};
use cloudeng_core::agent::RawAgentResult;
use cloudeng_core::config;
use cloudeng_core::normalize;
use cloudeng_core::render::Renderer;

use crate::modes::terminal;

pub fn run(file: Option<&Path>, config: &config::Config) -> Result<()> {
    // Raw bytes: output that is not UTF-8 is the normalizer's to report.
    let raw = match file {
        Some(path) => {
            fs::read(path).with_context(|| format!("read response from {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("read response from stdin")?;
            buf
        }
    };

    let renderer = Renderer::for_dir(&config.diagram_dir).context("build diagram pattern")?;
    let content = normalize::normalize(&RawAgentResult::Bytes(raw));
    terminal::print_content(&renderer, &content).context("write output")
}
