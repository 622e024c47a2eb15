//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cloudeng_core::{config, logging};

mod commands;

#[derive(Parser)]
#[command(name = "cloudeng")]
#[command(version = "0.1")]
#[command(about = "Cloud engineering assistant for AWS")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Do not start the MCP tool servers (only the built-in use_aws tool is available)
    #[arg(long = "no-tool-servers", global = true)]
    no_tool_servers: bool,

    /// Override the system prompt from config
    #[arg(long, global = true)]
    system_prompt: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sends one prompt to the agent and prints the reply
    Exec {
        /// The prompt to send to the agent
        #[arg(short, long)]
        prompt: String,
    },
    /// Runs a predefined task and prints the reply
    Task {
        /// Task key or menu number (see `cloudeng tasks`)
        #[arg(value_name = "TASK")]
        selector: String,
    },
    /// Lists the predefined tasks
    Tasks,
    /// Normalizes and renders a saved agent response (reads stdin without FILE)
    Render {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

/// Options shared by every command that talks to the agent.
pub struct AgentOptions {
    pub tool_servers: bool,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let mut config = config::Config::load().context("load config")?;

    let _log_guard = match logging::init(&config::paths::logs_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: file logging disabled: {e:#}");
            None
        }
    };

    if let Some(sp) = cli.system_prompt.as_deref() {
        let trimmed = sp.trim();
        config.system_prompt = (!trimmed.is_empty()).then(|| trimmed.to_string());
        config.system_prompt_file = None;
    }

    let Cli {
        command,
        no_tool_servers,
        system_prompt: _,
    } = cli;

    let agent_opts = AgentOptions {
        tool_servers: config.tool_servers.enabled && !no_tool_servers,
    };

    // default to chat mode
    let Some(command) = command else {
        return commands::chat::run(&config, &agent_opts).await;
    };

    match command {
        Commands::Exec { prompt } => commands::exec::run(&prompt, &config, &agent_opts).await,
        Commands::Task { selector } => commands::task::run(&selector, &config, &agent_opts).await,
        Commands::Tasks => commands::tasks::list(),
        Commands::Render { file } => commands::render::run(file.as_deref(), &config),
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
