//! Harness error taxonomy.
//!
//! Every failure is scenario-local. The run coordinator maps [`HarnessError::ToolchainMissing`] to a skip and
//! everything else to a failed scenario; [`HarnessError::kind`] is what the transcript and reports show for triage.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while provisioning, building, driving or verifying a scenario.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("toolchain `{tool}` is not installed")]
    #[diagnostic(code(dapcheck::toolchain_missing))]
    ToolchainMissing {
        tool: String,
        #[help]
        hint: String,
    },

    #[error("`{tool}` failed with exit code {}:\n{stderr}", fmt_code(.exit_code))]
    #[diagnostic(code(dapcheck::build))]
    Build {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` failed with exit code {}:\n{stderr}", fmt_code(.exit_code))]
    #[diagnostic(code(dapcheck::protocol))]
    Protocol {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` did not finish within {secs}s")]
    #[diagnostic(
        code(dapcheck::timeout),
        help("the harness never retries; re-run the suite or raise the timeout")
    )]
    Timeout { command: String, secs: u64 },

    #[error("expected {subject} {expected:?} {requirement}, captured:\n{actual}")]
    #[diagnostic(code(dapcheck::verification))]
    Verification {
        /// Which capture was checked: `output`, `locals` or `backtrace`.
        subject: &'static str,
        expected: String,
        requirement: String,
        actual: String,
    },

    #[error("`{command}` is not valid while the session is {state}")]
    #[diagnostic(code(dapcheck::out_of_order))]
    OutOfOrder { command: String, state: String },

    #[error("failed to spawn `{program}`: {source}")]
    #[diagnostic(code(dapcheck::spawn))]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {message}", .path.display())]
    #[diagnostic(code(dapcheck::config))]
    Config { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(dapcheck::io))]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`HarnessError`] used in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ToolchainMissing,
    Build,
    Protocol,
    Timeout,
    Verification,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ToolchainMissing => "toolchain-missing",
            ErrorKind::Build => "build",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Verification => "verification",
            ErrorKind::Internal => "internal",
        }
    }
}

impl HarnessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::ToolchainMissing { .. } => ErrorKind::ToolchainMissing,
            HarnessError::Build { .. } => ErrorKind::Build,
            HarnessError::Protocol { .. } => ErrorKind::Protocol,
            HarnessError::Timeout { .. } => ErrorKind::Timeout,
            HarnessError::Verification { .. } => ErrorKind::Verification,
            HarnessError::OutOfOrder { .. }
            | HarnessError::Spawn { .. }
            | HarnessError::Config { .. }
            | HarnessError::Io(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HarnessError::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn fmt_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (killed by signal)".to_string(), |c| c.to_string())
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
