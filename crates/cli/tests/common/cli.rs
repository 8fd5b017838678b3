//! `fwd` binary execution helpers
//!
//! Commands run on a blocking thread so an in-process consumer on the same
//! runtime keeps serving.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

/// CLI command builder with timing
pub struct FwdCommand {
    config_path: Option<PathBuf>,
    args: Vec<String>,
}

impl FwdCommand {
    pub fn new() -> Self {
        Self {
            config_path: None,
            args: Vec::new(),
        }
    }

    /// Add command arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Use an explicit config file instead of the user's
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Execute and return the result with timing
    pub async fn execute(self) -> Result<CommandResult> {
        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let mut command = Command::new(env!("CARGO_BIN_EXE_fwd"));
            if let Some(config) = &self.config_path {
                command.arg("--config").arg(config);
            }
            let output = command
                .args(&self.args)
                .env("RUST_LOG", "warn")
                .output()
                .context("Failed to execute fwd")?;

            Ok(CommandResult {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                duration: start.elapsed(),
            })
        })
        .await?
    }

    /// Execute and assert success
    pub async fn assert_success(self) -> Result<CommandResult> {
        let args = self.args.clone();
        let result = self.execute().await?;
        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                args,
                result.stdout,
                result.stderr
            );
        }
        Ok(result)
    }

    /// Execute and expect failure
    pub async fn assert_failure(self) -> Result<CommandResult> {
        let args = self.args.clone();
        let result = self.execute().await?;
        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                args,
                result.stdout
            );
        }
        Ok(result)
    }
}

/// Command execution result with timing
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stdout(&self, text: &str) -> bool {
        self.stdout.contains(text)
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// fwd!("list", "--server", &url).assert_success().await?;
/// ```
#[macro_export]
macro_rules! fwd {
    ($($arg:expr),*) => {{
        $crate::common::cli::FwdCommand::new().args(&[$($arg),*])
    }};
}
