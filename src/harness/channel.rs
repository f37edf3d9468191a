//! Command channel: one debugger CLI process per invocation.
//!
//! The debugger keeps its session in a background daemon addressed through the runtime-socket root, so the channel
//! itself is stateless. Every [`CommandInvocation`] spawns a fresh child, optionally pipes a whole script into its
//! stdin and closes it, waits for exit, and hands back both streams verbatim.
//!
//! ## I/O Boundary
//!
//! The session controller talks to a [`CommandChannel`], not to processes directly. [`ProcessChannel`] is the real
//! implementation; tests drive the controller through scripted in-memory channels.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::{HarnessError, HarnessResult};

/// Everything needed to run the debugger once. Built fresh for every call and never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub args: Vec<OsString>,
    pub env_overrides: Vec<(String, OsString)>,
    pub working_dir: PathBuf,
    /// Newline-separated commands written to stdin before it is closed.
    pub stdin_script: Option<String>,
    /// Wall-clock bound after which the child is killed.
    pub time_limit: Duration,
}

impl CommandInvocation {
    pub fn new<I, S>(args: I, working_dir: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            env_overrides: Vec::new(),
            working_dir: working_dir.into(),
            stdin_script: None,
            time_limit: Duration::from_secs(30),
        }
    }

    pub fn with_env(mut self, overrides: Vec<(String, OsString)>) -> Self {
        self.env_overrides = overrides;
        self
    }

    pub fn with_stdin_script(mut self, script: impl Into<String>) -> Self {
        self.stdin_script = Some(script.into());
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    /// Human-readable command line for logs and error messages.
    pub fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What one invocation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl SessionOutcome {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: Some(code),
        }
    }
}

/// Runs debugger invocations.
///
/// Implementations must deliver the commands of one invocation in order and must not share state between
/// invocations.
#[allow(async_fn_in_trait)]
pub trait CommandChannel {
    /// Run one invocation to completion.
    ///
    /// ## Errors
    ///
    /// - [`HarnessError::Spawn`] if the debugger could not be started.
    /// - [`HarnessError::Timeout`] if the child outlived `time_limit` (it is killed).
    ///
    /// A non-zero exit is **not** an error here; it is reported through [`SessionOutcome::success`].
    async fn invoke(&self, invocation: &CommandInvocation) -> HarnessResult<SessionOutcome>;
}

/// Spawns the real debugger binary.
#[derive(Debug, Clone)]
pub struct ProcessChannel {
    debugger: PathBuf,
}

impl ProcessChannel {
    pub fn new(debugger: impl Into<PathBuf>) -> Self {
        Self {
            debugger: debugger.into(),
        }
    }

    pub fn debugger(&self) -> &Path {
        &self.debugger
    }
}

impl CommandChannel for ProcessChannel {
    async fn invoke(&self, invocation: &CommandInvocation) -> HarnessResult<SessionOutcome> {
        let shown = invocation.display_args();
        tracing::info!(command = %shown, "running debugger");

        let mut child = Command::new(&self.debugger)
            .args(&invocation.args)
            .envs(invocation.env_overrides.iter().map(|(k, v)| (k, v)))
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                program: self.debugger.display().to_string(),
                source,
            })?;

        let stdin = child.stdin.take();
        let script = invocation.stdin_script.clone();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            if let Some(script) = script {
                stdin.write_all(script.as_bytes()).await?;
                if !script.ends_with('\n') {
                    stdin.write_all(b"\n").await?;
                }
            }
            stdin.shutdown().await
        };

        // Feed stdin and drain stdout/stderr concurrently so a chatty child can never block on a full pipe.
        let run = async { tokio::join!(feed, child.wait_with_output()) };
        let (fed, output) = match tokio::time::timeout(invocation.time_limit, run).await {
            Ok(pair) => pair,
            Err(_) => {
                tracing::warn!(command = %shown, limit_secs = invocation.time_limit.as_secs(), "debugger timed out");
                // Dropping `run` dropped the child, which kills it.
                return Err(HarnessError::Timeout {
                    command: shown,
                    secs: invocation.time_limit.as_secs(),
                });
            }
        };

        if let Err(e) = fed {
            // A child that exits before reading its whole script closes the pipe under us; its exit status says more.
            tracing::debug!(command = %shown, error = %e, "stdin closed early");
        }
        let output = output?;

        let outcome = SessionOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };

        if outcome.success {
            tracing::info!(command = %shown, "ok");
        } else {
            tracing::warn!(command = %shown, exit_code = ?outcome.exit_code, "debugger command failed");
            tracing::warn!("STDOUT: {}", outcome.stdout);
            tracing::warn!("STDERR: {}", outcome.stderr);
        }
        tracing::debug!(stdout = %outcome.stdout, stderr = %outcome.stderr, "captured streams");

        Ok(outcome)
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sh() -> ProcessChannel {
        ProcessChannel::new("/bin/sh")
    }

    #[tokio::test]
    async fn test_captures_streams_and_exit_code() {
        let inv = CommandInvocation::new(["-c", "echo out; echo err >&2; exit 3"], "/");
        let outcome = sh().invoke(&inv).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout, "out\n");
        assert_eq!(outcome.stderr, "err\n");
    }

    #[tokio::test]
    async fn test_stdin_script_is_delivered_in_order_then_closed() {
        let inv = CommandInvocation::new(["-c", "cat"], "/").with_stdin_script("first\nsecond\nthird");
        let outcome = sh().invoke(&inv).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.stdout, "first\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn test_env_overrides_and_working_dir_apply() {
        let dir = tempfile::tempdir().unwrap();
        let inv = CommandInvocation::new(["-c", "printf '%s|' \"$DAPCHECK_PROBE\"; pwd -P"], dir.path())
            .with_env(vec![("DAPCHECK_PROBE".to_string(), OsString::from("isolated"))]);
        let outcome = sh().invoke(&inv).await.unwrap();
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(outcome.stdout.trim_end(), format!("isolated|{}", canonical.display()));
    }

    #[tokio::test]
    async fn test_time_limit_kills_child() {
        let inv = CommandInvocation::new(["-c", "sleep 30"], "/").with_time_limit(Duration::from_millis(200));
        let err = sh().invoke(&inv).await.unwrap_err();
        assert!(matches!(err, HarnessError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let channel = ProcessChannel::new("/nonexistent/dapcheck-debugger");
        let err = channel.invoke(&CommandInvocation::new(["stop"], "/")).await.unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
    }
}
