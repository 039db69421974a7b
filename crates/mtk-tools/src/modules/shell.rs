//! Shell module: run a command with a timeout. Only built with the `shell` feature.

use crate::params::{parse_args, schema_of};
use async_trait::async_trait;
use mtk_host::{CallContext, Operation, OperationError, OperationMap, OperationOutput};
use mtk_registry::{Capability, InitContext, ModuleError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

const MAX_OUTPUT_BYTES: usize = 50 * 1024; // 50KB

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ShellOptions {
    working_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default)]
struct ShellSettings {
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

/// Capability type for the `shell` module.
#[derive(Debug, Default)]
pub struct Shell {
    settings: ShellSettings,
}

impl Capability for Shell {
    fn name(&self) -> &str {
        "Shell"
    }

    fn description(&self) -> &str {
        "Execute shell commands"
    }

    fn operations(&self) -> OperationMap {
        let mut ops = OperationMap::new();
        ops.insert("run_command".to_string(), Arc::new(RunCommand(self.settings.clone())));
        ops
    }

    fn initialize(&mut self, ctx: &InitContext) -> Result<(), ModuleError> {
        let options: ShellOptions = ctx.options_as()?;
        if let Some(dir) = &options.working_dir {
            if !dir.is_dir() {
                return Err(ModuleError::Initialization(format!(
                    "working_dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }
        self.settings = ShellSettings {
            working_dir: options.working_dir,
            timeout: options.timeout_secs.map(Duration::from_secs),
        };
        Ok(())
    }
}

fn shell_and_flag() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("/bin/sh", "-c")
    }
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RunCommandParams {
    /// Shell command to execute.
    pub command: String,
    /// Optional timeout in seconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

struct RunCommand(ShellSettings);

#[async_trait]
impl Operation for RunCommand {
    fn description(&self) -> &str {
        "Execute a shell command and return stdout/stderr."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        schema_of::<RunCommandParams>()
    }

    async fn call(
        &self,
        args: serde_json::Value,
        ctx: &CallContext,
    ) -> Result<OperationOutput, OperationError> {
        let params: RunCommandParams = parse_args(args)?;
        let timeout = params
            .timeout
            .map(Duration::from_secs)
            .or(self.0.timeout)
            .unwrap_or(ctx.timeout);
        let cwd = self.0.working_dir.as_ref().unwrap_or(&ctx.working_dir);

        let (shell, flag) = shell_and_flag();
        let mut command = Command::new(shell);
        command.arg(flag).arg(&params.command).current_dir(cwd).kill_on_drop(true);

        tracing::info!(command = %params.command, call_id = %ctx.call_id, "running shell command");
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| OperationError::Timeout(format!("Command timed out after {}s", timeout.as_secs())))?
            .map_err(|e| OperationError::ExecutionError(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        let mut text = String::new();
        if !stdout.is_empty() {
            text.push_str(&stdout);
        }
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str("STDERR:\n");
            text.push_str(&stderr);
        }
        if text.len() > MAX_OUTPUT_BYTES {
            let mut cut = MAX_OUTPUT_BYTES;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("\n\n... (truncated at 50KB)");
        }
        if text.is_empty() {
            text = "(no output)".to_string();
        }

        let is_error = !output.status.success();
        if is_error {
            text = format!("Exit code: {exit_code}\n{text}");
        }

        Ok(OperationOutput {
            output: text,
            metadata: serde_json::json!({"exit_code": exit_code}),
            is_error,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx(dir: &TempDir) -> CallContext {
        CallContext {
            working_dir: dir.path().to_path_buf(),
            ..Default::default()
        }
    }

    async fn run(args: serde_json::Value, dir: &TempDir) -> Result<OperationOutput, OperationError> {
        Shell::default().operations()["run_command"].call(args, &ctx(dir)).await
    }

    #[tokio::test]
    async fn test_echo() {
        let dir = TempDir::new().unwrap();
        let out = run(serde_json::json!({"command": "echo hello"}), &dir).await.unwrap();
        assert!(!out.is_error);
        assert_eq!(out.output.trim(), "hello");
    }

    #[tokio::test]
    async fn test_exit_code_and_stderr() {
        let dir = TempDir::new().unwrap();
        let out = run(serde_json::json!({"command": "echo oops >&2; exit 3"}), &dir)
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.output.starts_with("Exit code: 3"));
        assert!(out.output.contains("STDERR:\noops"));
        assert_eq!(out.metadata["exit_code"], 3);
    }

    #[tokio::test]
    async fn test_timeout() {
        let dir = TempDir::new().unwrap();
        let err = run(serde_json::json!({"command": "sleep 5", "timeout": 1}), &dir)
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let out = run(serde_json::json!({"command": "ls"}), &dir).await.unwrap();
        assert!(out.output.contains("marker.txt"));
    }
}
