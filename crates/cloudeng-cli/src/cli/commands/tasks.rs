//! Tasks command handler.

use std::io;

use anyhow::{Context, Result};

use crate::modes::terminal;

pub fn list() -> Result<()> {
    terminal::write_task_list(&mut io::stdout().lock()).context("write task list")
}
