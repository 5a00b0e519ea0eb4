//! CLI smoke tests for the timetable-server binary.

use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

fn run_timetable_server(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_timetable-server"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute timetable-server")
}

async fn run_timetable_server_with_timeout(
    args: &[&str],
    timeout_duration: Duration,
) -> Result<std::process::Output, Box<dyn std::error::Error>> {
    let mut cmd = tokio::process::Command::new(env!("CARGO_BIN_EXE_timetable-server"));
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    match timeout(timeout_duration, cmd.output()).await {
        Ok(result) => result.map_err(|e| e.into()),
        Err(elapsed) => Err(elapsed.into()),
    }
}

/// Config whose home directory lives inside `dir`.
fn write_config(dir: &TempDir, name: &str, body: &str) -> String {
    let home = dir.path().join("home").to_string_lossy().replace('\\', "/");
    let content = format!("server:\n  home_dir: \"{home}\"\n  host: \"127.0.0.1\"\n  port: 0\n{body}");
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write config file");
    path.to_string_lossy().to_string()
}

#[test]
fn test_cli_help_command() {
    let output = run_timetable_server(&["--help"]);

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("timetable-server") || stdout.contains("Timetable"));
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("--config"));
    assert!(stdout.contains("--mock"));
}

#[test]
fn test_cli_version_command() {
    let output = run_timetable_server(&["--version"]);

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("timetable-server"));
    assert!(stdout.contains("0.1.0"));
}

#[test]
fn test_cli_invalid_command() {
    let output = run_timetable_server(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"));
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_timetable_server(&["--config", "/nonexistent/config.yaml", "check"]);

    assert!(!output.status.success(), "Should fail with missing config");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("config file not found"),
        "Should mention config file issue: {stderr}"
    );
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("invalid.yaml");
    std::fs::write(&config_path, "invalid: yaml: content: [unclosed")
        .expect("Failed to write file");

    let output = run_timetable_server(&["--config", config_path.to_str().unwrap(), "check"]);

    assert!(!output.status.success(), "Should fail with invalid YAML");
}

#[test]
fn test_cli_check_accepts_module_sections() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "valid.yaml",
        r#"
database:
  url: "sqlite://database/timetable.db"

modules:
  schedule:
    session_ttl_hours: 24
    upcoming_exam_window_days: 14
  api_ingress:
    cors_enabled: true
"#,
    );

    let output = run_timetable_server(&["--config", &config_path, "check"]);

    if !output.status.success() {
        eprintln!("STDERR: {}", String::from_utf8_lossy(&output.stderr));
    }
    assert!(output.status.success(), "Should succeed with valid config");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration check passed"));
}

#[test]
fn test_cli_check_rejects_unknown_schedule_option() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "typo.yaml",
        r#"
modules:
  schedule:
    session_ttl: 24
"#,
    );

    let output = run_timetable_server(&["--config", &config_path, "check"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("schedule"), "{stderr}");
}

#[test]
fn test_cli_mock_flag_skips_database_url() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(
        &temp_dir,
        "mock.yaml",
        r#"
database:
  url: "mysql://localhost/unsupported"
"#,
    );

    let output = run_timetable_server(&["--config", &config_path, "check"]);
    assert!(!output.status.success(), "Unsupported backend should fail");

    let output = run_timetable_server(&["--config", &config_path, "--mock", "check"]);
    assert!(
        output.status.success(),
        "Should succeed with mock database: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_cli_print_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "print.yaml", "");

    let output = run_timetable_server(&["--config", &config_path, "--port", "9123", "--print-config"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("port: 9123"), "{stdout}");
}

#[tokio::test]
async fn test_cli_run_command_with_mock_database() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = write_config(&temp_dir, "run.yaml", "");

    let result = run_timetable_server_with_timeout(
        &["--config", &config_path, "--mock", "run"],
        Duration::from_secs(5),
    )
    .await;

    match result {
        // Still serving when the timeout hit.
        Err(err) if err.to_string().contains("elapsed") => {}
        Err(err) => panic!("Server failed to start: {err}"),
        Ok(output) => panic!(
            "Server exited early: {}",
            String::from_utf8_lossy(&output.stderr)
        ),
    }
}

#[test]
fn test_cli_subcommand_help() {
    let output = run_timetable_server(&["run", "--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Start the server"));

    let output = run_timetable_server(&["check", "--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Check configuration"));
}
