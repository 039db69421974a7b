//! Integration tests for mtk.
//!
//! These drive the built binary against a throwaway configuration and need no
//! network access or API keys.

use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const CONFIG: &str = r#"
enabled_tools:
  filesystem: true
  time_tools: true
  news_api: false
server:
  name: mtk-test
  log_level: warn
"#;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

fn mtk(config: &Path, allowed: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_mtk"));
    command
        .arg("--config")
        .arg(config)
        .arg("--allowed-dir")
        .arg(allowed)
        .env_remove("MTK_FILESYSTEM_DIRS")
        .env_remove("MTK_LOG_LEVEL")
        .env_remove("NEWS_API_KEY");
    command
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "mtk failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_status_json_reflects_configuration() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = mtk(&config, dir.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    let status = stdout_json(&output);

    let names: Vec<&str> = status["registered"]
        .as_array()
        .unwrap()
        .iter()
        .map(|report| report["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["filesystem", "time_tools"]);
    assert_eq!(status["disabled"], serde_json::json!(["news_api", "shell", "web_fetch"]));
    assert!(status["failed"].as_object().unwrap().is_empty());
    assert!(status["total_operations"].as_u64().unwrap() >= 6);
}

#[test]
fn test_call_reads_file_inside_allowed_dir() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);
    std::fs::write(dir.path().join("note.txt"), "hello from mtk").unwrap();

    let output = mtk(&config, dir.path())
        .args(["call", "read_file", "--args", r#"{"path": "note.txt"}"#])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "mtk failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("hello from mtk"));
}

#[test]
fn test_call_unknown_operation_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let output = mtk(&config, dir.path())
        .args(["call", "no_such_operation"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no_such_operation"));
}

#[test]
fn test_serve_answers_json_rpc_over_stdio() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir);

    let mut child = mtk(&config, dir.path())
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let requests = [
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_tools","arguments":{}}}"#,
    ];
    {
        let mut stdin = child.stdin.take().unwrap();
        for request in requests {
            writeln!(stdin, "{request}").unwrap();
        }
    }

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let responses: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);

    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "mtk-test");

    let tools: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    for expected in ["health_check", "list_tools", "read_file", "get_current_time"] {
        assert!(tools.contains(&expected), "missing {expected}");
    }
    assert!(!tools.contains(&"news_search"));

    let report = &responses[2]["result"]["structuredContent"];
    assert_eq!(
        report["disabled_tools"],
        serde_json::json!(["news_api", "shell", "web_fetch"])
    );
    assert!(report["registered_tools"]["time_tools"]["operations"]
        .as_object()
        .unwrap()
        .contains_key("convert_time"));
}

#[test]
fn test_config_init_writes_stock_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.yaml");

    let output = Command::new(env!("CARGO_BIN_EXE_mtk"))
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("enabled_tools"));
    assert!(written.contains("filesystem"));

    let again = Command::new(env!("CARGO_BIN_EXE_mtk"))
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert!(!again.status.success());
}
