//! End-to-end runs of the harness against the `mock-debugger` binary.
//!
//! Debuggees are small shell scripts so these tests need no compilers or debug adapters.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dapcheck::harness::report::{RunReport, RunReporter, ScenarioResult, ScenarioStatus};
use dapcheck::harness::{
    ErrorKind, HarnessConfig, ProcessChannel, Provisioner, RunCoordinator, Scenario, SessionController, Timeouts,
};
use dapcheck_core::adapters::AdapterId;
use dapcheck_core::protocol::SessionState;
use dapcheck_core::toolchains::BuildMethod;

const MOCK: &str = env!("CARGO_BIN_EXE_mock-debugger");

struct Quiet;

impl RunReporter for Quiet {
    fn on_scenario_complete(&mut self, _result: &ScenarioResult) {}
    fn on_run_complete(&mut self, _report: &RunReport) {}
}

/// Write an executable shell-script debuggee.
fn debuggee(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config(scratch: &Path) -> HarnessConfig {
    HarnessConfig::new()
        .with_debugger(MOCK)
        .with_scratch_dir(scratch)
        .with_settle_delay(Duration::ZERO)
        .with_python("dapcheck-no-such-python")
}

async fn run(config: &HarnessConfig, scenarios: &[Scenario]) -> RunReport {
    let channel = ProcessChannel::new(MOCK);
    RunCoordinator::new(&channel, config).run_all(scenarios, &mut Quiet).await
}

fn kind_of(report: &RunReport, name: &str) -> Option<ErrorKind> {
    report.results.iter().find(|r| r.name == name).and_then(|r| r.kind())
}

fn leftover_entries(scratch: &Path) -> usize {
    fs::read_dir(scratch).unwrap().count()
}

#[tokio::test]
async fn test_sum_is_30_passes() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "hello", "echo 'Hello from C! Sum is 30'");

    let report = run(
        &config(scratch.path()),
        &[Scenario::new("c", target, BuildMethod::None, "Sum is 30")],
    )
    .await;

    assert_eq!(report.passed(), 1, "{:?}", report.results);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(leftover_entries(scratch.path()), 0);
}

#[tokio::test]
async fn test_output_is_not_duplicated_by_continue_cycles() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "hello.py", "echo 'Hello from Python! Sum is 30'");

    let scenario = Scenario::new("python", target, BuildMethod::None, "Sum is 30").expect_exactly(1);
    let report = run(&config(scratch.path()), &[scenario]).await;

    assert_eq!(report.passed(), 1, "{:?}", report.results);
}

#[tokio::test]
async fn test_removed_breakpoints_are_not_hit_again() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "app.py", "echo 'Breakpoints App Finished'");
    let config = config(scratch.path());

    let script: Vec<String> = [
        "break add app.py:5",
        "break add app.py:10",
        "continue",
        "await",
        "break remove --all",
        "continue",
        "await",
        "output",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let env = Provisioner::new(&config).provision().unwrap();
    let channel = ProcessChannel::new(MOCK);
    let mut ctl = SessionController::new(&channel, &config, env.env_overrides(), work.path());
    ctl.stop().await;
    ctl.start(&target, None, &[]).await.unwrap();
    let outcome = ctl.run_script(&script).await.unwrap();
    let reached = ctl.state();
    ctl.stop().await;
    env.destroy().unwrap();

    assert!(outcome.success, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout.matches("Stopped at breakpoint").count(), 1, "{}", outcome.stdout);
    assert!(outcome.stdout.contains("Program exited"));
    assert!(outcome.stdout.contains("Breakpoints App Finished"));
    assert_eq!(reached, SessionState::Exited);
    assert_eq!(ctl.state(), SessionState::Unstarted);
}

#[tokio::test]
async fn test_script_scenario_through_coordinator() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "app.py", "echo 'Breakpoints App Finished'");

    let scenario = Scenario::new("script", target, BuildMethod::None, "Breakpoints App Finished").with_script([
        "break add app.py:5",
        "continue",
        "await",
        "bt --limit 5",
        "locals",
        "break remove --all",
        "continue",
        "await",
        "output",
    ]);
    let report = run(&config(scratch.path()), &[scenario]).await;
    assert_eq!(report.passed(), 1, "{:?}", report.results);
}

#[tokio::test]
async fn test_missing_compiler_skips() {
    let scratch = tempfile::tempdir().unwrap();
    let config = config(scratch.path()).with_compiler(BuildMethod::CompiledNative, "dapcheck-no-such-cc");
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");

    let scenario = Scenario::new("c", fixtures.join("hello_world.c"), BuildMethod::CompiledNative, "Sum is 30");
    let report = run(&config, &[scenario]).await;

    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failed(), 0);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.missing_tools()[0].0, "dapcheck-no-such-cc");
    assert_eq!(leftover_entries(scratch.path()), 0);
}

#[tokio::test]
async fn test_failing_compiler_fails() {
    let scratch = tempfile::tempdir().unwrap();
    let config = config(scratch.path()).with_compiler(BuildMethod::CompiledNative, "false");
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");

    let scenario = Scenario::new("c", fixtures.join("hello_world.c"), BuildMethod::CompiledNative, "Sum is 30");
    let report = run(&config, &[scenario]).await;

    assert_eq!(kind_of(&report, "c"), Some(ErrorKind::Build));
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_absent_adapter_skips() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "hello.py", "echo 'Sum is 30'");

    let scenario = Scenario::new("python", target, BuildMethod::None, "Sum is 30").with_adapter(AdapterId::Debugpy);
    let report = run(&config(scratch.path()), &[scenario]).await;

    assert!(matches!(report.results[0].status, ScenarioStatus::Skipped { .. }));
    assert_eq!(report.exit_code(), 0);
}

#[tokio::test]
async fn test_adapter_flag_is_resolved_through_registry() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "hello.go", "echo 'Hello from Go! Sum is 30'");

    // Skip the probe: only the registry entry written by the provisioner matters here.
    let scenario = Scenario::new("go", target, BuildMethod::None, "Sum is 30")
        .with_adapter(AdapterId::Delve)
        .with_probe(false);
    let report = run(&config(scratch.path()), &[scenario]).await;

    assert_eq!(report.passed(), 1, "{:?}", report.results);
}

#[tokio::test]
async fn test_verification_failure_reports_actual_output() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "hello", "echo 'Sum is 31'");

    let report = run(
        &config(scratch.path()),
        &[Scenario::new("c", target, BuildMethod::None, "Sum is 30")],
    )
    .await;

    assert_eq!(kind_of(&report, "c"), Some(ErrorKind::Verification));
    let message = report.results[0].message().unwrap();
    assert!(message.contains("Sum is 31"), "{message}");
}

#[tokio::test]
async fn test_locals_and_backtrace_are_verified_at_the_breakpoint() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let target = debuggee(work.path(), "hello", "echo 'Sum is 30'");

    let scenarios = [
        Scenario::new("matching", target.clone(), BuildMethod::None, "Sum is 30")
            .expect_locals(["x = 10", "y = 20"])
            .expect_backtrace(["#0 main"]),
        Scenario::new("wrong-local", target.clone(), BuildMethod::None, "Sum is 30").expect_locals(["z = 30"]),
        Scenario::new("wrong-frame", target, BuildMethod::None, "Sum is 30").expect_backtrace(["#0 helper"]),
    ];
    let report = run(&config(scratch.path()), &scenarios).await;

    assert_eq!(kind_of(&report, "matching"), None, "{:?}", report.results);
    assert_eq!(kind_of(&report, "wrong-local"), Some(ErrorKind::Verification));
    assert_eq!(kind_of(&report, "wrong-frame"), Some(ErrorKind::Verification));
    let message = report.results[1].message().unwrap();
    assert!(message.contains("expected locals \"z = 30\""), "{message}");
    assert!(message.contains("y = 20"), "{message}");
    let message = report.results[2].message().unwrap();
    assert!(message.contains("#0 main"), "{message}");
}

#[tokio::test]
async fn test_protocol_failure_does_not_affect_next_scenario() {
    let broken = tempfile::tempdir().unwrap();
    let healthy = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    fs::write(broken.path().join("mock-debugger.toml"), "fail = [\"start\"]\n").unwrap();
    let a = debuggee(broken.path(), "a", "echo 'Sum is 30'");
    let b = debuggee(healthy.path(), "b", "echo 'Sum is 30'");

    let report = run(
        &config(scratch.path()),
        &[
            Scenario::new("broken", a, BuildMethod::None, "Sum is 30"),
            Scenario::new("healthy", b, BuildMethod::None, "Sum is 30"),
        ],
    )
    .await;

    assert_eq!(kind_of(&report, "broken"), Some(ErrorKind::Protocol));
    assert_eq!(kind_of(&report, "healthy"), None);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(leftover_entries(scratch.path()), 0);
}

#[tokio::test]
async fn test_debugger_reported_timeout_is_classified() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    fs::write(work.path().join("mock-debugger.toml"), "await_timeout = true\n").unwrap();
    let target = debuggee(work.path(), "hello", "echo 'Sum is 30'");

    let report = run(
        &config(scratch.path()),
        &[Scenario::new("c", target, BuildMethod::None, "Sum is 30")],
    )
    .await;

    assert_eq!(kind_of(&report, "c"), Some(ErrorKind::Timeout));
}

#[tokio::test]
async fn test_hung_debugger_is_killed_at_the_wall_clock_bound() {
    let work = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    fs::write(work.path().join("mock-debugger.toml"), "hang = [\"await\"]\n").unwrap();
    let target = debuggee(work.path(), "hello", "echo 'Sum is 30'");

    let config = config(scratch.path())
        .with_timeouts(Timeouts {
            adapter_initialize_secs: 5,
            request_secs: 5,
            await_default_secs: 1,
        })
        .with_invocation_grace(Duration::ZERO);
    let report = run(&config, &[Scenario::new("c", target, BuildMethod::None, "Sum is 30")]).await;

    assert_eq!(kind_of(&report, "c"), Some(ErrorKind::Timeout));
    assert_eq!(leftover_entries(scratch.path()), 0);
}

#[tokio::test]
async fn test_stop_without_session_succeeds() {
    let scratch = tempfile::tempdir().unwrap();
    let config = config(scratch.path());
    let env = Provisioner::new(&config).provision().unwrap();

    let channel = ProcessChannel::new(MOCK);
    let invocation = dapcheck::harness::CommandInvocation::new(["stop"], scratch.path()).with_env(env.env_overrides());
    let outcome = dapcheck::harness::CommandChannel::invoke(&channel, &invocation).await.unwrap();
    assert!(outcome.success, "stderr: {}", outcome.stderr);
    env.destroy().unwrap();
}

#[tokio::test]
async fn test_builtin_c_scenario_passes_or_skips() {
    let scratch = tempfile::tempdir().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    let suite = dapcheck::builtin_suite(&fixtures);
    let c: Vec<Scenario> = suite.into_iter().filter(|s| s.name == "c").collect();

    let report = run(&config(scratch.path()), &c).await;
    // Hosts without a C compiler skip; hosts with one must pass.
    assert_eq!(report.failed(), 0, "{:?}", report.results);
}
