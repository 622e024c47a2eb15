use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_tasks_lists_registry_in_order() {
    let dir = tempdir().unwrap();

    let output = cargo_bin_cmd!("cloudeng")
        .env("CLOUDENG_HOME", dir.path())
        .arg("tasks")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 11);
    assert!(lines[0].contains("ec2_status"));
    assert!(lines[0].contains("List all EC2 instances and their status"));
    assert!(lines[10].contains("generate_diagram"));
}

#[test]
fn test_unknown_task_fails_before_contacting_anything() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("cloudeng")
        .env("CLOUDENG_HOME", dir.path())
        .env_remove("ANTHROPIC_API_KEY")
        .args(["task", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown task 'bogus'"));
}
