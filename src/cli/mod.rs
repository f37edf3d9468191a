//! CLI module for the dapcheck harness
//!
//! ## Commands
//!
//! - `run` - Run the scenario suite against a debugger binary
//! - `list` - List the scenarios a run would execute
//! - `probe` - Report which optional debug adapters are installed
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `reporter` - Console and JSON run reporters
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod reporter;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use dapcheck_core::toolchains::{self, BuildMethod};

use crate::version::DAPCHECK_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a harness error with its diagnostic code and help text.
    pub fn diagnostic(err: crate::harness::HarnessError) -> Self {
        Self::failure(format!("{:?}", miette::Report::new(err)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Debug-session orchestration and verification harness
#[derive(Parser, Debug)]
#[command(name = "dapcheck")]
#[command(version = DAPCHECK_VERSION)]
#[command(about = "Drive a debugger CLI through scripted sessions and verify what it reports", long_about = None)]
pub struct Cli {
    /// Log every step at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Report format for `run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Console,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scenario suite
    Run {
        /// Debugger binary to drive (default: $DAPCHECK_DEBUGGER, then target/release/debugger)
        #[arg(long, value_name = "PATH")]
        debugger: Option<PathBuf>,
        /// Directory holding the debuggee fixtures
        #[arg(long, value_name = "DIR", default_value = "fixtures")]
        fixtures: PathBuf,
        /// Additional scenarios from a TOML file
        #[arg(long, value_name = "FILE")]
        scenarios: Option<PathBuf>,
        /// Only run scenarios whose name contains this text
        #[arg(short = 'k', value_name = "FILTER")]
        filter: Option<String>,
        /// Stop on first failure
        #[arg(short = 'x', long = "exitfirst")]
        stop_on_fail: bool,
        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
        format: OutputFormat,
        /// Python interpreter for the debugpy adapter
        #[arg(long, value_name = "PATH", default_value = "python3")]
        python: String,
        /// Override a build method's compiler (e.g. `native=clang`)
        #[arg(long = "compiler", value_name = "METHOD=PROGRAM", value_parser = parse_compiler_override)]
        compilers: Vec<(BuildMethod, String)>,
    },

    /// List the scenarios a run would execute
    List {
        /// Directory holding the debuggee fixtures
        #[arg(long, value_name = "DIR", default_value = "fixtures")]
        fixtures: PathBuf,
        /// Additional scenarios from a TOML file
        #[arg(long, value_name = "FILE")]
        scenarios: Option<PathBuf>,
    },

    /// Report which optional debug adapters are installed
    Probe {
        /// Python interpreter for the debugpy adapter
        #[arg(long, value_name = "PATH", default_value = "python3")]
        python: String,
    },
}

fn parse_compiler_override(raw: &str) -> Result<(BuildMethod, String), String> {
    let (method, program) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected METHOD=PROGRAM, got `{raw}`"))?;
    let method = toolchains::from_str(method.trim()).ok_or_else(|| format!("unknown build method `{method}`"))?;
    if toolchains::compiler(method).is_none() {
        return Err(format!("build method `{}` has no compiler", toolchains::as_str(method)));
    }
    let program = program.trim();
    if program.is_empty() {
        return Err("compiler program must not be empty".to_string());
    }
    Ok((method, program.to_string()))
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Structured logging on stderr with an env-based filter, defaulting to info (debug with `-v`).
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Run {
            debugger,
            fixtures,
            scenarios,
            filter,
            stop_on_fail,
            format,
            python,
            compilers,
        } => commands::run_suite(commands::RunOptions {
            debugger,
            fixtures,
            scenarios,
            filter,
            stop_on_fail,
            format,
            python,
            compilers,
            verbose: cli.verbose,
        }),
        Command::List { fixtures, scenarios } => commands::list_scenarios(&fixtures, scenarios.as_deref()),
        Command::Probe { python } => commands::probe_adapters(&python),
    }
}

// ============================================================================
// Tests
// ============================================================================
