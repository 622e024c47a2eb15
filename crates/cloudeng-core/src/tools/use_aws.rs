//! `use_aws` tool: runs read-style AWS API calls through the `aws` CLI.
//!
//! The model names a service and an operation; request parameters go through
//! `--cli-input-json` so no shell quoting is involved.

use std::process::Stdio;

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::{ToolContext, ToolDefinition, ToolOutput};
use crate::config::AwsConfig;

/// Maximum bytes per output stream (stdout/stderr) before truncation.
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// How the `aws` CLI is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCliSettings {
    pub cli_path: String,
    pub region: String,
    pub profile: Option<String>,
}

impl Default for AwsCliSettings {
    fn default() -> Self {
        Self {
            cli_path: "aws".to_string(),
            region: crate::config::DEFAULT_AWS_REGION.to_string(),
            profile: None,
        }
    }
}

impl AwsCliSettings {
    pub fn from_config(config: &AwsConfig) -> Self {
        Self {
            cli_path: config.cli_path.clone(),
            region: config.effective_region(),
            profile: config.profile.clone(),
        }
    }
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "use_aws".to_string(),
        description: "Make an AWS API call through the AWS CLI. Use it to inspect resources \
            (describe, list, get operations). Returns the JSON response, stderr and exit code."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "service_name": {
                    "type": "string",
                    "description": "AWS CLI service name, e.g. ec2, s3api, cloudwatch, iam, lambda, rds"
                },
                "operation_name": {
                    "type": "string",
                    "description": "Operation in snake_case or kebab-case, e.g. describe_instances"
                },
                "parameters": {
                    "type": "object",
                    "description": "Request parameters using the API's field names, e.g. {\"InstanceIds\": [\"i-123\"]}"
                },
                "region": {
                    "type": "string",
                    "description": "AWS region override"
                },
                "profile_name": {
                    "type": "string",
                    "description": "AWS profile override"
                },
                "label": {
                    "type": "string",
                    "description": "Short human-readable description of the call"
                }
            },
            "required": ["service_name", "operation_name"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
struct UseAwsInput {
    service_name: String,
    operation_name: String,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    profile_name: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

/// A fully resolved CLI call.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AwsCall {
    service: String,
    operation: String,
    region: String,
    profile: Option<String>,
    input_json: Option<String>,
}

impl AwsCall {
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            self.service.clone(),
            self.operation.clone(),
            "--output".to_string(),
            "json".to_string(),
            "--region".to_string(),
            self.region.clone(),
        ];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        if let Some(input_json) = &self.input_json {
            args.push("--cli-input-json".to_string());
            args.push(input_json.clone());
        }
        args
    }
}

pub async fn execute(input: &Value, ctx: &ToolContext) -> ToolOutput {
    let input: UseAwsInput = match serde_json::from_value(input.clone()) {
        Ok(i) => i,
        Err(e) => {
            return ToolOutput::failure(
                "invalid_input",
                format!("Invalid input for use_aws tool: {e}"),
                None,
            );
        }
    };

    let call = match resolve_call(input, ctx) {
        Ok(call) => call,
        Err(output) => return output,
    };

    run_call(&call, ctx).await
}

fn resolve_call(input: UseAwsInput, ctx: &ToolContext) -> Result<AwsCall, ToolOutput> {
    let service = input.service_name.trim().to_ascii_lowercase();
    let operation = to_kebab_case(input.operation_name.trim());
    for (field, value) in [("service_name", &service), ("operation_name", &operation)] {
        if value.is_empty() {
            return Err(ToolOutput::failure(
                "invalid_input",
                format!("{field} cannot be empty"),
                None,
            ));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ToolOutput::failure(
                "invalid_input",
                format!("{field} contains unsupported characters: '{value}'"),
                None,
            ));
        }
    }

    let input_json = match input.parameters {
        Some(params) if !params.is_empty() => Some(Value::Object(params).to_string()),
        _ => None,
    };

    if let Some(label) = &input.label {
        tracing::info!(%label, %service, %operation, "use_aws call");
    }

    Ok(AwsCall {
        service,
        operation,
        region: non_empty(input.region).unwrap_or_else(|| ctx.aws.region.clone()),
        profile: non_empty(input.profile_name).or_else(|| ctx.aws.profile.clone()),
        input_json,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn run_call(call: &AwsCall, ctx: &ToolContext) -> ToolOutput {
    let args = call.args();
    tracing::debug!(cli = %ctx.aws.cli_path, ?args, "spawning aws cli");

    let child = match tokio::process::Command::new(&ctx.aws.cli_path)
        .args(&args)
        // No pager, no colors: output goes straight back to the model.
        .env("AWS_PAGER", "")
        .env("NO_COLOR", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return ToolOutput::failure(
                "spawn_error",
                format!("Failed to run '{}'", ctx.aws.cli_path),
                Some(format!("Error: {e}")),
            );
        }
    };

    let output_fut = child.wait_with_output();
    let output = match ctx.timeout {
        Some(timeout) => match tokio::time::timeout(timeout, output_fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(service = %call.service, operation = %call.operation, "aws cli timed out");
                return ToolOutput::failure(
                    "timeout",
                    format!(
                        "{} {} timed out after {} seconds",
                        call.service,
                        call.operation,
                        timeout.as_secs()
                    ),
                    None,
                );
            }
        },
        None => output_fut.await,
    };
    let output = match output {
        Ok(output) => output,
        Err(e) => {
            return ToolOutput::failure(
                "exec_error",
                format!("Failed to run '{}'", ctx.aws.cli_path),
                Some(format!("Error: {e}")),
            );
        }
    };

    let (stdout, stdout_truncated) = truncate_output(&output.stdout, MAX_OUTPUT_BYTES);
    let (stderr, stderr_truncated) = truncate_output(&output.stderr, MAX_OUTPUT_BYTES);
    let exit_code = output.status.code().unwrap_or(-1);

    if !output.status.success() {
        return ToolOutput::failure_with_details(
            "aws_cli_error",
            format!(
                "{} {} exited with status {exit_code}",
                call.service, call.operation
            ),
            stderr,
        );
    }

    let response = if stdout_truncated {
        Value::String(stdout)
    } else {
        serde_json::from_str(&stdout).unwrap_or(Value::String(stdout))
    };

    ToolOutput::success(json!({
        "service": call.service,
        "operation": call.operation,
        "region": call.region,
        "exit_code": exit_code,
        "response": response,
        "stderr": stderr,
        "stdout_truncated": stdout_truncated,
        "stderr_truncated": stderr_truncated,
    }))
}

/// Truncates lossy-decoded output at a UTF-8 boundary.
fn truncate_output(bytes: &[u8], max_bytes: usize) -> (String, bool) {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= max_bytes {
        return (text.into_owned(), false);
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    (text[..end].to_string(), true)
}

/// `DescribeInstances`, `describe_instances` and `describe-instances` all
/// become `describe-instances`.
fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower_or_digit = false;
        } else if c.is_ascii_uppercase() {
            if prev_lower_or_digit && !out.ends_with('-') {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with_cli(cli_path: &str) -> ToolContext {
        ToolContext::new(
            AwsCliSettings {
                cli_path: cli_path.to_string(),
                region: "eu-west-1".to_string(),
                profile: None,
            },
            None,
        )
    }

    #[test]
    fn test_to_kebab_case() {
        assert_eq!(to_kebab_case("describe_instances"), "describe-instances");
        assert_eq!(to_kebab_case("DescribeInstances"), "describe-instances");
        assert_eq!(to_kebab_case("describe-instances"), "describe-instances");
        assert_eq!(to_kebab_case("ListBuckets"), "list-buckets");
        assert_eq!(to_kebab_case("describe_db_instances"), "describe-db-instances");
        assert_eq!(to_kebab_case("GetMetricData_"), "get-metric-data");
    }

    #[test]
    fn test_args_include_region_profile_and_parameters() {
        let input: UseAwsInput = serde_json::from_value(json!({
            "service_name": "EC2",
            "operation_name": "describe_volumes",
            "parameters": {"Filters": [{"Name": "status", "Values": ["available"]}]},
            "profile_name": "dev"
        }))
        .unwrap();
        let call = resolve_call(input, &ctx_with_cli("aws")).unwrap();
        assert_eq!(
            call.args(),
            vec![
                "ec2",
                "describe-volumes",
                "--output",
                "json",
                "--region",
                "eu-west-1",
                "--profile",
                "dev",
                "--cli-input-json",
                r#"{"Filters":[{"Name":"status","Values":["available"]}]}"#,
            ]
        );
    }

    #[test]
    fn test_region_override_and_empty_parameters() {
        let input: UseAwsInput = serde_json::from_value(json!({
            "service_name": "s3api",
            "operation_name": "list_buckets",
            "parameters": {},
            "region": "ap-south-1",
            "profile_name": "  "
        }))
        .unwrap();
        let call = resolve_call(input, &ctx_with_cli("aws")).unwrap();
        assert_eq!(call.region, "ap-south-1");
        assert_eq!(call.profile, None);
        assert_eq!(call.input_json, None);
    }

    #[tokio::test]
    async fn test_rejects_invalid_names() {
        let ctx = ctx_with_cli("aws");
        let output = execute(&json!({"service_name": "ec2; rm", "operation_name": "x"}), &ctx).await;
        assert_eq!(output.error().map(|e| e.code.as_str()), Some("invalid_input"));

        let output = execute(&json!({"service_name": "ec2", "operation_name": ""}), &ctx).await;
        assert_eq!(
            output.error().map(|e| e.message.as_str()),
            Some("operation_name cannot be empty")
        );

        let output = execute(&json!({"operation_name": "x"}), &ctx).await;
        assert_eq!(output.error().map(|e| e.code.as_str()), Some("invalid_input"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_cli_and_captures_stdout() {
        let ctx = ctx_with_cli("echo");
        let output = execute(
            &json!({"service_name": "ec2", "operation_name": "DescribeInstances"}),
            &ctx,
        )
        .await;
        let data = output.data().unwrap();
        assert_eq!(data["exit_code"], 0);
        assert_eq!(
            data["response"].as_str().map(str::trim),
            Some("ec2 describe-instances --output json --region eu-west-1")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_failure() {
        let ctx = ctx_with_cli("false");
        let output = execute(
            &json!({"service_name": "ec2", "operation_name": "describe_instances"}),
            &ctx,
        )
        .await;
        let error = output.error().unwrap();
        assert_eq!(error.code, "aws_cli_error");
        assert!(error.message.contains("exited with status 1"));
    }

    #[tokio::test]
    async fn test_missing_cli_is_spawn_error() {
        let ctx = ctx_with_cli("/nonexistent/aws-cli-binary");
        let output = execute(
            &json!({"service_name": "ec2", "operation_name": "describe_instances"}),
            &ctx,
        )
        .await;
        assert_eq!(output.error().map(|e| e.code.as_str()), Some("spawn_error"));
    }

    #[test]
    fn test_truncate_output_respects_char_boundary() {
        let (text, truncated) = truncate_output("aé".as_bytes(), 2);
        assert_eq!(text, "a");
        assert!(truncated);
        let (text, truncated) = truncate_output(b"short", 10);
        assert_eq!(text, "short");
        assert!(!truncated);
    }
}
