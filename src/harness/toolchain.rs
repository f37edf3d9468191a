//! Debuggee builds and adapter capability probes.
//!
//! Both shell out through `tokio::process`. A program that cannot be found is reported as
//! [`HarnessError::ToolchainMissing`] so the coordinator can skip the scenario instead of failing it.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use dapcheck_core::adapters::{self, AdapterId, LaunchProgram};
use dapcheck_core::toolchains::{self, BuildMethod, Compiler};
use tokio::process::Command;

use super::config::HarnessConfig;
use super::error::{HarnessError, HarnessResult};

/// Produces debuggee executables inside an environment's build directory.
#[derive(Debug, Clone)]
pub struct ToolchainBuilder<'a> {
    config: &'a HarnessConfig,
}

impl<'a> ToolchainBuilder<'a> {
    pub fn new(config: &'a HarnessConfig) -> Self {
        Self { config }
    }

    /// Program used for a compiled build method, honouring configured overrides.
    pub fn program_for(&self, method: BuildMethod, compiler: &Compiler) -> String {
        self.config
            .compilers
            .get(&method)
            .cloned()
            .unwrap_or_else(|| compiler.program.to_string())
    }

    /// Full argument vector for a compiled build: `<flags...> -o <output> <source>`.
    pub fn build_args(compiler: &Compiler, output: &Path, source: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = compiler.flags.iter().map(OsString::from).collect();
        args.push("-o".into());
        args.push(output.into());
        args.push(source.into());
        args
    }

    /// Build `source` into `build_dir` and return the path the debugger should launch.
    ///
    /// Interpreted sources are returned unchanged. Compiled outputs are named after the source's file stem.
    ///
    /// ## Errors
    ///
    /// - [`HarnessError::ToolchainMissing`] if the compiler is not installed.
    /// - [`HarnessError::Build`] if the compiler exits non-zero; its stderr is carried verbatim.
    pub async fn build(&self, source: &Path, method: BuildMethod, build_dir: &Path) -> HarnessResult<PathBuf> {
        let Some(compiler) = toolchains::compiler(method) else {
            return Ok(source.to_path_buf());
        };

        let stem = source.file_stem().unwrap_or(source.as_os_str());
        let output = build_dir.join(stem);
        let program = self.program_for(method, &compiler);
        let args = Self::build_args(&compiler, &output, source);

        tracing::info!(
            tool = %program,
            method = toolchains::as_str(method),
            source = %source.display(),
            "building debuggee"
        );

        let result = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        let output_status = match result {
            Ok(out) => out,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(HarnessError::ToolchainMissing {
                    tool: program,
                    hint: compiler.install_hint.to_string(),
                });
            }
            Err(source) => return Err(HarnessError::Spawn { program, source }),
        };

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr).into_owned();
            tracing::warn!(tool = %program, exit_code = ?output_status.status.code(), "build failed");
            return Err(HarnessError::Build {
                tool: program,
                exit_code: output_status.status.code(),
                stderr,
            });
        }

        tracing::debug!(output = %output.display(), "build succeeded");
        Ok(output)
    }
}

// ============================================================================
// Capability probes
// ============================================================================

/// Result of probing one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub adapter: AdapterId,
    /// Program the probe ran (also the tool named in a skip).
    pub program: String,
    pub available: bool,
    pub install_hint: &'static str,
}

impl ProbeReport {
    /// Turn an absent adapter into the skip-worthy error.
    pub fn into_result(self) -> HarnessResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(HarnessError::ToolchainMissing {
                tool: format!("{} ({})", adapters::as_str(self.adapter), self.program),
                hint: self.install_hint.to_string(),
            })
        }
    }
}

/// Check whether an adapter is usable on this machine.
///
/// Adapters without a probe (the debugger's built-in default) always report available. Otherwise the probe command
/// must spawn and exit zero; anything else counts as absent.
pub async fn probe_adapter(config: &HarnessConfig, adapter: AdapterId) -> ProbeReport {
    let launch = adapters::launch(adapter);
    let program = match launch.program {
        LaunchProgram::Named(name) => name.to_string(),
        LaunchProgram::PythonInterpreter => config.python.clone(),
    };

    let available = match launch.probe_args {
        None => true,
        Some(args) => {
            let status = Command::new(&program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await;
            matches!(status, Ok(s) if s.success())
        }
    };

    tracing::debug!(adapter = adapters::as_str(adapter), %program, available, "probed adapter");
    ProbeReport {
        adapter,
        program,
        available,
        install_hint: launch.install_hint,
    }
}

/// Probe every registered adapter, in registry order.
pub async fn probe_all(config: &HarnessConfig) -> Vec<ProbeReport> {
    let mut reports = Vec::with_capacity(adapters::ADAPTERS.len());
    for row in adapters::ADAPTERS {
        reports.push(probe_adapter(config, row.id).await);
    }
    reports
}
