//! Tool servers spoken to over the Model Context Protocol.
//!
//! Each server runs as a child process. [`ToolServers`] owns every running
//! client for the lifetime of the session; call [`ToolServers::shutdown`] when
//! done. Dropping it also tears the children down.

pub mod schema;

use std::collections::BTreeMap;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{Peer, RoleClient, RunningService};
use rmcp::transport::TokioChildProcess;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::tools::{ToolContext, ToolDefinition, ToolHandler, ToolOutput, ToolRegistry};

/// How to launch one tool server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolServerSpec {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl ToolServerSpec {
    pub fn new(name: &str, command: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    /// Documentation lookup and diagram generation servers.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("aws-docs", "uvx", &["awslabs.aws-documentation-mcp-server@latest"]),
            Self::new("aws-diagram", "uvx", &["awslabs.aws-diagram-mcp-server@latest"]),
        ]
    }
}

/// A tool as advertised by a server, schema already flattened.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl RemoteTool {
    /// Reads a listed tool from its wire form.
    fn from_wire(tool: &Value) -> Option<Self> {
        let name = tool.get("name")?.as_str()?.to_string();
        let description = tool
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let input_schema = tool
            .get("inputSchema")
            .map_or_else(|| json!({"type": "object"}), schema::flatten_refs);
        Some(Self {
            name,
            description,
            input_schema,
        })
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

struct ToolServer {
    name: String,
    service: RunningService<RoleClient, ()>,
    tools: Vec<RemoteTool>,
}

/// Running tool-server clients.
#[derive(Default)]
pub struct ToolServers {
    servers: Vec<ToolServer>,
}

impl std::fmt::Debug for ToolServers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServers")
            .field("servers", &self.server_names())
            .field("tools", &self.tool_count())
            .finish()
    }
}

impl ToolServers {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts every server and lists its tools.
    ///
    /// # Errors
    /// Returns an error if any server fails to spawn, initialize or list its
    /// tools. Servers started before the failure are shut down first.
    pub async fn start(specs: &[ToolServerSpec]) -> Result<Self> {
        let mut started = Self::empty();
        for spec in specs {
            match start_server(spec).await {
                Ok(server) => {
                    tracing::info!(
                        server = %server.name,
                        tools = server.tools.len(),
                        "tool server started"
                    );
                    started.servers.push(server);
                }
                Err(e) => {
                    started.shutdown().await;
                    return Err(e.context(format!("Failed to start tool server '{}'", spec.name)));
                }
            }
        }
        Ok(started)
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.servers.iter().map(|s| s.tools.len()).sum()
    }

    /// Adds every remote tool to `registry`.
    pub fn register_tools(&self, registry: &mut ToolRegistry) {
        for server in &self.servers {
            for tool in &server.tools {
                registry.register(
                    tool.definition(),
                    remote_handler(server.service.peer().clone(), tool.name.clone()),
                );
            }
        }
    }

    /// Stops every server, logging the outcome of each.
    pub async fn shutdown(self) {
        for server in self.servers {
            match server.service.cancel().await {
                Ok(reason) => tracing::info!(server = %server.name, ?reason, "tool server stopped"),
                Err(e) => tracing::warn!(server = %server.name, error = %e, "tool server did not stop cleanly"),
            }
        }
    }
}

async fn start_server(spec: &ToolServerSpec) -> Result<ToolServer> {
    let mut cmd = tokio::process::Command::new(&spec.command);
    cmd.args(&spec.args).envs(&spec.env);

    let (transport, stderr) = TokioChildProcess::builder(cmd)
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to spawn '{}'", spec.command))?;
    if let Some(stderr) = stderr {
        forward_stderr(spec.name.clone(), stderr);
    }

    let service = ()
        .serve(transport)
        .await
        .map_err(|e| anyhow!("MCP initialization failed: {e}"))?;

    let listed = match service.list_all_tools().await {
        Ok(listed) => listed,
        Err(e) => {
            let _ = service.cancel().await;
            return Err(anyhow!("Listing tools failed: {e}"));
        }
    };
    let tools = listed
        .iter()
        .filter_map(|tool| serde_json::to_value(tool).ok())
        .filter_map(|wire| RemoteTool::from_wire(&wire))
        .collect();

    Ok(ToolServer {
        name: spec.name.clone(),
        service,
        tools,
    })
}

/// Server stderr goes to the log file, never to the terminal.
fn forward_stderr<R>(server: String, stderr: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(%server, "{line}");
        }
    });
}

fn remote_handler(peer: Peer<RoleClient>, tool_name: String) -> ToolHandler {
    std::sync::Arc::new(move |input: &Value, ctx: &ToolContext| {
        let peer = peer.clone();
        let tool_name = tool_name.clone();
        let input = input.clone();
        let timeout = ctx.timeout;
        Box::pin(async move {
            let call = call_remote(&peer, &tool_name, input);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                    ToolOutput::failure(
                        "timeout",
                        format!("{tool_name} timed out after {} seconds", limit.as_secs()),
                        None,
                    )
                }),
                None => call.await,
            }
        })
    })
}

async fn call_remote(peer: &Peer<RoleClient>, tool_name: &str, input: Value) -> ToolOutput {
    let arguments = match input {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            return ToolOutput::failure(
                "invalid_input",
                format!("Arguments for {tool_name} must be an object, got {other}"),
                None,
            );
        }
    };

    let param: CallToolRequestParam =
        match serde_json::from_value(json!({"name": tool_name, "arguments": arguments})) {
            Ok(param) => param,
            Err(e) => {
                return ToolOutput::failure("invalid_input", format!("Bad tool call: {e}"), None);
            }
        };

    tracing::debug!(tool = %tool_name, "calling remote tool");
    match peer.call_tool(param).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(wire) => output_from_wire(&wire),
            Err(e) => ToolOutput::failure("remote_error", format!("Unreadable result: {e}"), None),
        },
        Err(e) => ToolOutput::failure(
            "remote_error",
            format!("{tool_name} call failed"),
            Some(e.to_string()),
        ),
    }
}

/// Converts a `CallToolResult` in wire form into a tool envelope.
fn output_from_wire(result: &Value) -> ToolOutput {
    let mut texts = Vec::new();
    if let Some(items) = result.get("content").and_then(Value::as_array) {
        for item in items {
            match item.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(text) = item.get("text").and_then(Value::as_str) {
                        texts.push(text.to_string());
                    }
                }
                Some(kind) => match item.get("mimeType").and_then(Value::as_str) {
                    Some(mime) => texts.push(format!("[{kind} content {mime}]")),
                    None => texts.push(format!("[{kind} content]")),
                },
                None => {}
            }
        }
    }
    let text = texts.join("\n");

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        return ToolOutput::failure("tool_error", text, None);
    }

    let mut data = json!({ "content": text });
    if let Some(structured) = result.get("structuredContent").filter(|v| !v.is_null()) {
        data["structured"] = structured.clone();
    }
    ToolOutput::success(data)
}
