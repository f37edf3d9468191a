//! Run reporters (pytest-style console output and a JSON document).

use std::io::{self, Write};

use crate::harness::{RunReport, RunReporter, Scenario, ScenarioResult, ScenarioStatus};

/// One console line per finished scenario: name, colored status, duration in whole milliseconds.
fn status_line(result: &ScenarioResult) -> String {
    let status = match &result.status {
        ScenarioStatus::Passed => "\x1b[32mPASSED\x1b[0m".to_string(),
        ScenarioStatus::Failed(e) => format!("\x1b[31mFAILED\x1b[0m [{}]", e.kind().as_str()),
        ScenarioStatus::Skipped { tool, .. } => format!("\x1b[33mSKIPPED\x1b[0m ({} not installed)", tool),
    };
    format!("{} {} ({}ms)", result.name, status, result.duration.as_millis())
}

/// Default console reporter (pytest-style)
#[derive(Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl RunReporter for ConsoleReporter {
    fn on_run_start(&mut self, scenario_count: usize) {
        if scenario_count == 0 {
            eprintln!("No scenarios selected");
        } else {
            println!("collected {} scenario(s)", scenario_count);
            println!();
        }
    }

    fn on_scenario_start(&mut self, scenario: &Scenario) {
        if self.verbose {
            println!("\x1b[1m--- {} ---\x1b[0m", scenario.name);
        }
    }

    fn on_scenario_complete(&mut self, result: &ScenarioResult) {
        println!("{}", status_line(result));
    }

    fn on_run_complete(&mut self, report: &RunReport) {
        let failures: Vec<_> = report
            .results
            .iter()
            .filter_map(|r| match &r.status {
                ScenarioStatus::Failed(e) => Some((r, e)),
                _ => None,
            })
            .collect();

        if !failures.is_empty() {
            println!();
            println!("\x1b[1;31m=================== FAILURES ===================\x1b[0m");
            for (result, error) in failures {
                println!();
                println!("\x1b[1m___________ {} ___________\x1b[0m", result.name);
                println!();
                println!("    [{}]", error.kind().as_str());
                for line in error.to_string().lines() {
                    println!("    {}", line);
                }
            }
        }

        let missing = report.missing_tools();
        if !missing.is_empty() {
            println!();
            println!("\x1b[1;33m=============== MISSING DEPENDENCIES ===============\x1b[0m");
            for (tool, hint) in missing {
                println!("  {:<24} install: {}", tool, hint);
            }
        }

        println!();
        let summary_color = if report.failed() > 0 { "\x1b[1;31m" } else { "\x1b[1;32m" };

        let mut parts = Vec::new();
        if report.passed() > 0 {
            parts.push(format!("{} passed", report.passed()));
        }
        if report.failed() > 0 {
            parts.push(format!("{} failed", report.failed()));
        }
        if report.skipped() > 0 {
            parts.push(format!("{} skipped", report.skipped()));
        }
        if parts.is_empty() {
            parts.push("no scenarios ran".to_string());
        }

        println!(
            "{}=================== {} in {:.2}s ===================\x1b[0m",
            summary_color,
            parts.join(", "),
            report.duration.as_secs_f64()
        );
    }
}

/// Writes the whole report as one JSON document when the run completes.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl JsonReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RunReporter for JsonReporter<W> {
    fn on_scenario_complete(&mut self, _result: &ScenarioResult) {}

    fn on_run_complete(&mut self, report: &RunReport) {
        let written = serde_json::to_writer_pretty(&mut self.out, &report.to_json())
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self.out));
        if let Err(e) = written {
            tracing::error!(error = %e, "failed to write JSON report");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::harness::HarnessError;

    #[test]
    fn test_status_line_shows_whole_milliseconds() {
        let result = ScenarioResult {
            name: "c".to_string(),
            status: ScenarioStatus::Passed,
            duration: Duration::from_micros(1_234_567),
        };
        assert_eq!(status_line(&result), "c \x1b[32mPASSED\x1b[0m (1234ms)");

        let skipped = ScenarioResult {
            name: "go".to_string(),
            status: ScenarioStatus::Skipped {
                tool: "dlv".to_string(),
                hint: String::new(),
            },
            duration: Duration::ZERO,
        };
        assert!(status_line(&skipped).ends_with("(dlv not installed) (0ms)"));
    }

    #[test]
    fn test_json_reporter_writes_one_document() {
        let report = RunReport {
            results: vec![
                ScenarioResult {
                    name: "c".to_string(),
                    status: ScenarioStatus::Passed,
                    duration: Duration::from_millis(5),
                },
                ScenarioResult {
                    name: "go".to_string(),
                    status: ScenarioStatus::Failed(HarnessError::Timeout {
                        command: "await --timeout 60".to_string(),
                        secs: 60,
                    }),
                    duration: Duration::from_millis(7),
                },
            ],
            duration: Duration::from_millis(12),
        };

        let mut reporter = JsonReporter::new(Vec::new());
        for r in &report.results {
            reporter.on_scenario_complete(r);
        }
        reporter.on_run_complete(&report);

        let text = String::from_utf8(reporter.into_inner()).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["passed"], 1);
        assert_eq!(doc["failed"], 1);
        assert_eq!(doc["scenarios"][1]["kind"], "timeout");
        assert_eq!(doc["scenarios"][1]["message"], "`await --timeout 60` did not finish within 60s");
    }
}
