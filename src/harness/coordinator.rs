//! Run coordinator: every scenario gets its own environment, its own build and its own session.
//!
//! ```text
//! probe -> provision -> build -> drive session -> stop -> verify -> destroy
//! ```
//!
//! Scenarios run strictly one after another, so exactly one isolated environment is live at a time. Teardown is
//! structural: the environment is destroyed explicitly on every path, and its `Drop` impl covers anything that
//! unwinds past that point.

use std::path::{self, PathBuf};
use std::time::Instant;

use tracing::Instrument;

use super::channel::CommandChannel;
use super::config::HarnessConfig;
use super::controller::SessionController;
use super::environment::{IsolatedEnvironment, Provisioner};
use super::error::{HarnessError, HarnessResult};
use super::report::{RunReport, RunReporter, ScenarioResult, ScenarioStatus};
use super::scenario::Scenario;
use super::toolchain::{ToolchainBuilder, probe_adapter};
use super::verifier;

/// Runs a list of scenarios against one debugger.
pub struct RunCoordinator<'a, C: CommandChannel> {
    channel: &'a C,
    config: &'a HarnessConfig,
    provisioner: Provisioner,
    stop_on_fail: bool,
    filter: Option<String>,
}

impl<'a, C: CommandChannel> RunCoordinator<'a, C> {
    pub fn new(channel: &'a C, config: &'a HarnessConfig) -> Self {
        Self {
            channel,
            config,
            provisioner: Provisioner::new(config),
            stop_on_fail: false,
            filter: None,
        }
    }

    /// Stop after the first failed scenario (skips do not count).
    pub fn with_stop_on_fail(mut self, stop_on_fail: bool) -> Self {
        self.stop_on_fail = stop_on_fail;
        self
    }

    /// Only run scenarios whose name contains `filter`.
    pub fn with_filter(mut self, filter: Option<String>) -> Self {
        self.filter = filter;
        self
    }

    /// Scenarios selected by the name filter, in order.
    pub fn select<'s>(&self, scenarios: &'s [Scenario]) -> Vec<&'s Scenario> {
        scenarios
            .iter()
            .filter(|s| self.filter.as_deref().is_none_or(|f| s.name.contains(f)))
            .collect()
    }

    /// Run every selected scenario and aggregate the results.
    ///
    /// One scenario's failure never prevents the next from running (unless stop-on-fail is set). The process exit
    /// code is [`RunReport::exit_code`].
    pub async fn run_all(&self, scenarios: &[Scenario], reporter: &mut dyn RunReporter) -> RunReport {
        let started = Instant::now();
        let selected = self.select(scenarios);
        reporter.on_run_start(selected.len());

        let mut report = RunReport::default();
        for scenario in selected {
            reporter.on_scenario_start(scenario);

            let span = tracing::info_span!("scenario", name = %scenario.name);
            let scenario_started = Instant::now();
            let status = match self.run_one(scenario).instrument(span).await {
                Ok(()) => ScenarioStatus::Passed,
                Err(e) => ScenarioStatus::from_error(e),
            };

            match &status {
                ScenarioStatus::Passed => tracing::info!(scenario = %scenario.name, "PASSED"),
                ScenarioStatus::Failed(e) => {
                    tracing::error!(scenario = %scenario.name, kind = e.kind().as_str(), error = %e, "FAILED")
                }
                ScenarioStatus::Skipped { tool, .. } => {
                    tracing::warn!(scenario = %scenario.name, %tool, "SKIPPED (toolchain not installed)")
                }
            }

            let result = ScenarioResult {
                name: scenario.name.clone(),
                status,
                duration: scenario_started.elapsed(),
            };
            reporter.on_scenario_complete(&result);
            let stop = self.stop_on_fail && matches!(result.status, ScenarioStatus::Failed(_));
            report.results.push(result);

            if stop {
                tracing::info!("stopping after first failure");
                break;
            }
        }

        report.duration = started.elapsed();
        reporter.on_run_complete(&report);
        report
    }

    /// One scenario from probe to teardown.
    async fn run_one(&self, scenario: &Scenario) -> HarnessResult<()> {
        if let Some(adapter) = scenario.probed_adapter() {
            probe_adapter(self.config, adapter).await.into_result()?;
        }

        let env = self.provisioner.provision()?;
        let result = self.exercise(scenario, &env).await;

        let root = env.root().to_path_buf();
        match env.destroy() {
            Ok(()) => result,
            Err(e) => {
                tracing::warn!(root = %root.display(), error = %e, "failed to remove isolated environment");
                // Surface a teardown failure only when the scenario itself was fine.
                result.and(Err(HarnessError::Io(e)))
            }
        }
    }

    async fn exercise(&self, scenario: &Scenario, env: &IsolatedEnvironment) -> HarnessResult<()> {
        let source = absolute(&scenario.source)?;
        let target = ToolchainBuilder::new(self.config)
            .build(&source, scenario.build, env.build_dir())
            .await?;

        let working_dir = source.parent().map(PathBuf::from).unwrap_or_else(|| scenario.working_dir());
        let mut controller = SessionController::new(self.channel, self.config, env.env_overrides(), working_dir);

        let capture = controller.drive(scenario, &target).await;
        controller.stop().await;

        verifier::check(scenario, &capture?)
    }
}

fn absolute(p: &std::path::Path) -> HarnessResult<PathBuf> {
    Ok(path::absolute(p)?)
}
