//! Run results and the reporter hook.
//!
//! ## RunReporter Trait
//!
//! The coordinator reports progress through a [`RunReporter`] so presentation stays out of the run loop. The CLI
//! ships a coloured console reporter and a JSON reporter.

use std::time::Duration;

use serde_json::{Value, json};

use super::error::{ErrorKind, HarnessError};
use super::scenario::Scenario;

/// How one scenario ended.
#[derive(Debug)]
pub enum ScenarioStatus {
    Passed,
    Failed(HarnessError),
    /// A toolchain or adapter was absent. Never counts as a failure.
    Skipped {
        tool: String,
        hint: String,
    },
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Passed => "passed",
            ScenarioStatus::Failed(_) => "failed",
            ScenarioStatus::Skipped { .. } => "skipped",
        }
    }

    /// Classify a scenario error: missing toolchains skip, everything else fails.
    pub fn from_error(err: HarnessError) -> Self {
        match err {
            HarnessError::ToolchainMissing { tool, hint } => ScenarioStatus::Skipped { tool, hint },
            other => ScenarioStatus::Failed(other),
        }
    }
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub status: ScenarioStatus,
    pub duration: Duration,
}

impl ScenarioResult {
    pub fn kind(&self) -> Option<ErrorKind> {
        match &self.status {
            ScenarioStatus::Passed => None,
            ScenarioStatus::Failed(e) => Some(e.kind()),
            ScenarioStatus::Skipped { .. } => Some(ErrorKind::ToolchainMissing),
        }
    }

    pub fn message(&self) -> Option<String> {
        match &self.status {
            ScenarioStatus::Passed => None,
            ScenarioStatus::Failed(e) => Some(e.to_string()),
            ScenarioStatus::Skipped { tool, .. } => Some(format!("`{tool}` is not installed")),
        }
    }
}

/// Everything one run produced, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<ScenarioResult>,
    pub duration: Duration,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.count(|s| matches!(s, ScenarioStatus::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ScenarioStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ScenarioStatus::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&ScenarioStatus) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.status)).count()
    }

    /// Process exit status: 1 if any scenario failed, 0 otherwise. Skips never fail the run.
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 { 1 } else { 0 }
    }

    /// Distinct missing tools with their install hints, in first-seen order.
    pub fn missing_tools(&self) -> Vec<(&str, &str)> {
        let mut tools: Vec<(&str, &str)> = Vec::new();
        for r in &self.results {
            if let ScenarioStatus::Skipped { tool, hint } = &r.status {
                if !tools.iter().any(|(t, _)| *t == tool.as_str()) {
                    tools.push((tool.as_str(), hint.as_str()));
                }
            }
        }
        tools
    }

    /// Machine-readable form of the report.
    pub fn to_json(&self) -> Value {
        let scenarios: Vec<Value> = self
            .results
            .iter()
            .map(|r| {
                let mut entry = json!({
                    "name": r.name,
                    "status": r.status.as_str(),
                    "duration_ms": r.duration.as_millis() as u64,
                });
                if let Some(kind) = r.kind() {
                    entry["kind"] = json!(kind.as_str());
                }
                if let Some(message) = r.message() {
                    entry["message"] = json!(message);
                }
                entry
            })
            .collect();

        json!({
            "scenarios": scenarios,
            "passed": self.passed(),
            "failed": self.failed(),
            "skipped": self.skipped(),
        })
    }
}

/// Progress hooks called by the run coordinator.
pub trait RunReporter {
    /// Called once the scenario list is final.
    fn on_run_start(&mut self, _scenario_count: usize) {}

    /// Called before a scenario's probe, build and session.
    fn on_scenario_start(&mut self, _scenario: &Scenario) {}

    /// Called when a scenario has finished and its environment is gone.
    fn on_scenario_complete(&mut self, result: &ScenarioResult);

    /// Called when every scenario has run (or the run stopped early).
    fn on_run_complete(&mut self, report: &RunReport);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_report() -> RunReport {
        RunReport {
            results: vec![
                ScenarioResult {
                    name: "c".to_string(),
                    status: ScenarioStatus::Passed,
                    duration: Duration::from_millis(1200),
                },
                ScenarioResult {
                    name: "python".to_string(),
                    status: ScenarioStatus::Failed(HarnessError::Verification {
                        subject: "output",
                        expected: "Sum is 30".to_string(),
                        requirement: "to occur".to_string(),
                        actual: "Sum is 31".to_string(),
                    }),
                    duration: Duration::from_millis(800),
                },
                ScenarioResult {
                    name: "go".to_string(),
                    status: ScenarioStatus::Skipped {
                        tool: "dlv".to_string(),
                        hint: "go install github.com/go-delve/delve/cmd/dlv@latest".to_string(),
                    },
                    duration: Duration::from_millis(3),
                },
            ],
            duration: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_counts_and_exit_code() {
        let report = sample_report();
        assert_eq!((report.passed(), report.failed(), report.skipped()), (1, 1, 1));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_skips_do_not_fail_the_run() {
        let mut report = sample_report();
        report.results.remove(1);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.missing_tools(), vec![("dlv", "go install github.com/go-delve/delve/cmd/dlv@latest")]);
    }

    #[test]
    fn test_toolchain_missing_maps_to_skip() {
        let status = ScenarioStatus::from_error(HarnessError::ToolchainMissing {
            tool: "gcc".to_string(),
            hint: "apt install gcc".to_string(),
        });
        assert_eq!(status.as_str(), "skipped");
        let status = ScenarioStatus::from_error(HarnessError::Timeout {
            command: "await".to_string(),
            secs: 60,
        });
        assert_eq!(status.as_str(), "failed");
    }

    #[test]
    fn test_json_report_shape() {
        insta::assert_snapshot!(serde_json::to_string_pretty(&sample_report().to_json()).unwrap(), @r#"
        {
          "failed": 1,
          "passed": 1,
          "scenarios": [
            {
              "duration_ms": 1200,
              "name": "c",
              "status": "passed"
            },
            {
              "duration_ms": 800,
              "kind": "verification",
              "message": "expected output \"Sum is 30\" to occur, captured:\nSum is 31",
              "name": "python",
              "status": "failed"
            },
            {
              "duration_ms": 3,
              "kind": "toolchain-missing",
              "message": "`dlv` is not installed",
              "name": "go",
              "status": "skipped"
            }
          ],
          "skipped": 1
        }
        "#);
    }
}
