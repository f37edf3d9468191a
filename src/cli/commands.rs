//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::env;
use std::path::{Path, PathBuf};

use dapcheck_core::adapters;
use dapcheck_core::toolchains::{self, BuildMethod};
use tokio::runtime::Runtime;

use crate::harness::config::DEBUGGER_ENV;
use crate::harness::scenario::check_unique_names;
use crate::harness::toolchain::probe_all;
use crate::harness::{HarnessConfig, ProcessChannel, RunCoordinator, RunReporter, Scenario, builtin_suite, load_scenarios};

use super::reporter::{ConsoleReporter, JsonReporter};
use super::{CliError, CliResult, ExitCode, OutputFormat};

/// Options for `dapcheck run`, as parsed from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub debugger: Option<PathBuf>,
    pub fixtures: PathBuf,
    pub scenarios: Option<PathBuf>,
    pub filter: Option<String>,
    pub stop_on_fail: bool,
    pub format: OutputFormat,
    pub python: String,
    pub compilers: Vec<(BuildMethod, String)>,
    pub verbose: bool,
}

/// Run the suite and map the report to the process exit code.
pub fn run_suite(opts: RunOptions) -> CliResult<ExitCode> {
    let debugger = resolve_debugger(opts.debugger, env::var_os(DEBUGGER_ENV).map(PathBuf::from));
    if !debugger.exists() {
        return Err(CliError::failure(format!(
            "Error: debugger binary not found at {}\nBuild it first, pass --debugger PATH, or set {}",
            debugger.display(),
            DEBUGGER_ENV
        )));
    }

    let mut config = HarnessConfig::new()
        .with_debugger(&debugger)
        .with_fixtures_dir(&opts.fixtures)
        .with_python(opts.python);
    for (method, program) in opts.compilers {
        config = config.with_compiler(method, program);
    }

    let scenarios = collect_scenarios(&config.fixtures_dir, opts.scenarios.as_deref())?;
    tracing::info!(debugger = %debugger.display(), scenarios = scenarios.len(), "starting run");

    let runtime = runtime()?;
    let channel = ProcessChannel::new(&config.debugger);
    let coordinator = RunCoordinator::new(&channel, &config)
        .with_filter(opts.filter)
        .with_stop_on_fail(opts.stop_on_fail);

    let mut reporter: Box<dyn RunReporter> = match opts.format {
        OutputFormat::Console => Box::new(ConsoleReporter::new(opts.verbose)),
        OutputFormat::Json => Box::new(JsonReporter::stdout()),
    };
    let report = runtime.block_on(coordinator.run_all(&scenarios, reporter.as_mut()));

    match report.exit_code() {
        0 => Ok(ExitCode::SUCCESS),
        // Summary already printed
        code => Err(CliError::new("", ExitCode(code))),
    }
}

/// Print the scenarios a run would execute.
pub fn list_scenarios(fixtures: &Path, extra: Option<&Path>) -> CliResult<ExitCode> {
    let scenarios = collect_scenarios(fixtures, extra)?;
    let width = scenarios.iter().map(|s| s.name.len()).max().unwrap_or(0);

    for s in &scenarios {
        let adapter = s.adapter.map_or("(default)", adapters::as_str);
        let mode = if s.script.is_some() { "script" } else { "stepwise" };
        println!(
            "{:<width$}  {:<10}  {:<10}  {:<8}  {}",
            s.name,
            toolchains::as_str(s.build),
            adapter,
            mode,
            s.source.display(),
        );
    }
    println!();
    println!("{} scenario(s)", scenarios.len());
    Ok(ExitCode::SUCCESS)
}

/// Probe every adapter and print what is installed.
pub fn probe_adapters(python: &str) -> CliResult<ExitCode> {
    let config = HarnessConfig::new().with_python(python);
    let reports = runtime()?.block_on(probe_all(&config));

    for r in &reports {
        let name = adapters::as_str(r.adapter);
        if r.available {
            println!("\x1b[32m✓\x1b[0m {:<10} {}", name, r.program);
        } else {
            println!("\x1b[31m✗\x1b[0m {:<10} {} \x1b[2m(install: {})\x1b[0m", name, r.program, r.install_hint);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Explicit flag first, then the environment, then the configured default.
fn resolve_debugger(flag: Option<PathBuf>, from_env: Option<PathBuf>) -> PathBuf {
    flag.or(from_env).unwrap_or_else(|| HarnessConfig::default().debugger)
}

fn collect_scenarios(fixtures: &Path, extra: Option<&Path>) -> CliResult<Vec<Scenario>> {
    let mut scenarios = builtin_suite(fixtures);
    if let Some(path) = extra {
        scenarios.extend(load_scenarios(path).map_err(CliError::diagnostic)?);
    }
    check_unique_names(&scenarios).map_err(|e| CliError::failure(format!("Error: {e}")))?;
    Ok(scenarios)
}

/// Scenarios run one at a time, so a single-threaded runtime is enough.
fn runtime() -> CliResult<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error: failed to start async runtime: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_debugger_flag_wins_over_environment() {
        let resolved = resolve_debugger(Some("/flag".into()), Some("/env".into()));
        assert_eq!(resolved, PathBuf::from("/flag"));
        let resolved = resolve_debugger(None, Some("/env".into()));
        assert_eq!(resolved, PathBuf::from("/env"));
        let resolved = resolve_debugger(None, None);
        assert_eq!(resolved, HarnessConfig::default().debugger);
    }

    #[test]
    fn test_missing_debugger_refuses_to_run() {
        let err = run_suite(RunOptions {
            debugger: Some("/definitely/not/a/debugger".into()),
            fixtures: "fixtures".into(),
            scenarios: None,
            filter: None,
            stop_on_fail: false,
            format: OutputFormat::Console,
            python: "python3".to_string(),
            compilers: Vec::new(),
            verbose: false,
        })
        .unwrap_err();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("debugger binary not found"));
    }

    #[test]
    fn test_scenario_file_collision_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("extra.toml");
        std::fs::write(&file, "[[scenario]]\nname = \"c\"\nsource = \"a.c\"\nexpect = \"x\"\n").unwrap();
        let err = collect_scenarios(Path::new("fixtures"), Some(&file)).unwrap_err();
        assert!(err.message.contains("duplicate scenario name `c`"));
    }
}
