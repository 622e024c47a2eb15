//! Configuration management.
//!
//! Loads configuration from `${CLOUDENG_HOME}/config.toml` with defaults for
//! every field.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::mcp::ToolServerSpec;
use crate::prompts;
use crate::render::DEFAULT_DIAGRAM_DIR;

/// Region used when neither config nor `AWS_REGION` names one.
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for configuration and log directories.
    //!
    //! CLOUDENG_HOME resolution order:
    //! 1. CLOUDENG_HOME environment variable (if set)
    //! 2. ~/.config/cloudeng (default)
    //! 3. ./.cloudeng when no home directory is known

    use std::path::PathBuf;

    pub fn cloudeng_home() -> PathBuf {
        if let Ok(home) = std::env::var("CLOUDENG_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".cloudeng"),
            |h| h.join(".config").join("cloudeng"),
        )
    }

    pub fn config_path() -> PathBuf {
        cloudeng_home().join("config.toml")
    }

    pub fn logs_dir() -> PathBuf {
        cloudeng_home().join("logs")
    }
}

/// Credentials and endpoint overrides for a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic: ProviderConfig,
}

/// How the `use_aws` tool reaches AWS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub cli_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Per-call timeout in seconds (0 disables).
    pub timeout_secs: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            cli_path: "aws".to_string(),
            region: None,
            profile: None,
            timeout_secs: 120,
        }
    }
}

impl AwsConfig {
    /// Region from config, then `AWS_REGION`, then `us-east-1`.
    pub fn effective_region(&self) -> String {
        Self::pick_region(self.region.as_deref(), std::env::var("AWS_REGION").ok().as_deref())
    }

    fn pick_region(configured: Option<&str>, env: Option<&str>) -> String {
        [configured, env]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|r| !r.is_empty())
            .unwrap_or(DEFAULT_AWS_REGION)
            .to_string()
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolServersConfig {
    pub enabled: bool,
    pub servers: Vec<ToolServerSpec>,
}

impl Default for ToolServersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            servers: ToolServerSpec::defaults(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Upper bound on model round-trips per request.
    pub max_turns: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Takes precedence over `system_prompt`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt_file: Option<String>,
    pub diagram_dir: String,
    pub providers: ProvidersConfig,
    pub aws: AwsConfig,
    pub tool_servers: ToolServersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            max_tokens: Self::DEFAULT_MAX_TOKENS,
            temperature: Some(Self::DEFAULT_TEMPERATURE),
            max_turns: Self::DEFAULT_MAX_TURNS,
            system_prompt: None,
            system_prompt_file: None,
            diagram_dir: DEFAULT_DIAGRAM_DIR.to_string(),
            providers: ProvidersConfig::default(),
            aws: AwsConfig::default(),
            tool_servers: ToolServersConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
    const DEFAULT_MAX_TOKENS: u32 = 8192;
    const DEFAULT_TEMPERATURE: f32 = 0.1;
    const DEFAULT_MAX_TURNS: u32 = 25;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// System prompt: `system_prompt_file`, then `system_prompt`, then the
    /// built-in prompt.
    ///
    /// # Errors
    /// Returns an error if `system_prompt_file` is set but unreadable.
    pub fn effective_system_prompt(&self) -> Result<String> {
        if let Some(file) = self.system_prompt_file.as_deref().filter(|f| !f.trim().is_empty()) {
            let path = Path::new(file);
            return fs::read_to_string(path)
                .with_context(|| format!("Failed to read system prompt from {}", path.display()));
        }
        Ok(match self.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
            _ => prompts::SYSTEM_PROMPT.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.diagram_dir, "/tmp/generated-diagrams");
        assert!(config.tool_servers.enabled);
        assert_eq!(config.tool_servers.servers.len(), 2);
    }

    #[test]
    fn test_template_matches_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
model = "claude-haiku-4-5"
max_turns = 5

[aws]
region = "eu-central-1"
timeout_secs = 0

[tool_servers]
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "claude-haiku-4-5");
        assert_eq!(config.max_turns, 5);
        assert_eq!(config.max_tokens, 8192);
        assert_eq!(config.aws.effective_region(), "eu-central-1");
        assert_eq!(config.aws.timeout(), None);
        assert_eq!(config.aws.cli_path, "aws");
        assert!(!config.tool_servers.enabled);
        assert_eq!(config.tool_servers.servers, ToolServerSpec::defaults());
    }

    #[test]
    fn test_custom_tool_servers() {
        let config: Config = toml::from_str(
            r#"
[[tool_servers.servers]]
name = "local"
command = "/usr/local/bin/my-server"
args = ["--stdio"]
env = { LOG_LEVEL = "debug" }
"#,
        )
        .unwrap();
        assert_eq!(config.tool_servers.servers.len(), 1);
        let server = &config.tool_servers.servers[0];
        assert_eq!(server.args, vec!["--stdio".to_string()]);
        assert_eq!(server.env.get("LOG_LEVEL").map(String::as_str), Some("debug"));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_tokens = \"lots\"").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::init(&path).unwrap();
        assert!(path.exists());
        let err = Config::init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_region_precedence() {
        assert_eq!(AwsConfig::pick_region(Some("eu-west-2"), Some("us-west-2")), "eu-west-2");
        assert_eq!(AwsConfig::pick_region(Some(" "), Some("us-west-2")), "us-west-2");
        assert_eq!(AwsConfig::pick_region(None, None), DEFAULT_AWS_REGION);
    }

    #[test]
    fn test_system_prompt_precedence() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("prompt.md");
        fs::write(&file, "from file").unwrap();

        let mut config = Config::default();
        assert_eq!(config.effective_system_prompt().unwrap(), prompts::SYSTEM_PROMPT);

        config.system_prompt = Some("inline".into());
        assert_eq!(config.effective_system_prompt().unwrap(), "inline");

        config.system_prompt_file = Some(file.display().to_string());
        assert_eq!(config.effective_system_prompt().unwrap(), "from file");

        config.system_prompt_file = Some(dir.path().join("missing.md").display().to_string());
        assert!(config.effective_system_prompt().is_err());
    }
}
