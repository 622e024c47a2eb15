//! Integration tests for exec mode against a mock Messages API.
//!
//! Covers the tool loop with the built-in use_aws tool (backed by `echo`),
//! reply normalization, and provider failures surfacing as reply text.


use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{json_response, text_json, tool_use_json};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Creates a temp CLOUDENG_HOME whose AWS CLI is `echo`.
fn temp_home() -> TempDir {
    let home = TempDir::new().expect("create temp cloudeng home");
    fs::write(
        home.path().join("config.toml"),
        "[aws]\ncli_path = \"echo\"\nregion = \"eu-west-1\"\n\n[tool_servers]\nenabled = false\n",
    )
    .expect("write config");
    home
}

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn test_exec_runs_use_aws_and_prints_normalized_reply() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let mock_server = MockServer::start().await;

    let call_count = Arc::new(AtomicUsize::new(0));
    let call_count_clone = Arc::clone(&call_count);
    let second_request_body = Arc::new(std::sync::Mutex::new(String::new()));
    let second_request_body_clone = Arc::clone(&second_request_body);

    let first_response = tool_use_json(
        "toolu_aws_001",
        "use_aws",
        r#"{"service_name": "s3api", "operation_name": "list_buckets", "label": "List buckets"}"#,
    );
    let second_response = text_json("<thinking>two buckets listed</thinking>You have **2** buckets.");

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-api-key"))
        .respond_with(move |req: &Request| {
            let count = call_count_clone.fetch_add(1, Ordering::SeqCst);
            if count == 0 {
                json_response(&first_response)
            } else {
                let body = String::from_utf8_lossy(&req.body).to_string();
                *second_request_body_clone.lock().unwrap() = body;
                json_response(&second_response)
            }
        })
        .expect(2)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("cloudeng")
        .env("CLOUDENG_HOME", home.path())
        .env("ANTHROPIC_API_KEY", "test-api-key")
        .env("ANTHROPIC_BASE_URL", mock_server.uri())
        .args(["--no-tool-servers", "exec", "-p", "How many S3 buckets do I have?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("You have **2** buckets."))
        .stdout(predicate::str::contains("two buckets listed").not());

    assert_eq!(call_count.load(Ordering::SeqCst), 2);

    let body = second_request_body.lock().unwrap().clone();
    assert!(body.contains("\"tool_result\""), "tool result missing: {body}");
    assert!(body.contains("toolu_aws_001"));
    assert!(body.contains("s3api list-buckets"), "echo output missing: {body}");
    assert!(body.contains("eu-west-1"));
}

#[tokio::test]
async fn test_exec_provider_error_is_printed_as_reply() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("cloudeng")
        .env("CLOUDENG_HOME", home.path())
        .env("ANTHROPIC_API_KEY", "test-api-key")
        .env("ANTHROPIC_BASE_URL", mock_server.uri())
        .args(["--no-tool-servers", "exec", "-p", "List alarms"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Error executing task:"));
}

#[tokio::test]
async fn test_task_sends_description_as_prompt() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(wiremock::matchers::body_string_contains(
            "Find unattached EBS volumes that could be removed",
        ))
        .respond_with(json_response(&text_json("No unattached volumes.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("cloudeng")
        .env("CLOUDENG_HOME", home.path())
        .env("ANTHROPIC_API_KEY", "test-api-key")
        .env("ANTHROPIC_BASE_URL", mock_server.uri())
        .args(["--no-tool-servers", "task", "ebs_volumes"])
        .assert()
        .success()
        .stdout("No unattached volumes.\n");
}

#[test]
fn test_exec_without_api_key_fails() {
    let home = temp_home();

    cargo_bin_cmd!("cloudeng")
        .env("CLOUDENG_HOME", home.path())
        .env_remove("ANTHROPIC_API_KEY")
        .args(["--no-tool-servers", "exec", "-p", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}
