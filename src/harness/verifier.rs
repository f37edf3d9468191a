//! Scenario verification: literal substring containment over the captured output, locals and backtrace.

use super::channel::SessionOutcome;
use super::controller::SessionCapture;
use super::error::{HarnessError, HarnessResult};
use super::scenario::Scenario;

/// Whether `expected` occurs literally in the captured stdout. No whitespace or ordering normalization.
pub fn verify(outcome: &SessionOutcome, expected: &str) -> bool {
    outcome.stdout.contains(expected)
}

/// Number of non-overlapping occurrences of `expected` in the captured stdout.
pub fn occurrences(outcome: &SessionOutcome, expected: &str) -> usize {
    if expected.is_empty() {
        return 0;
    }
    outcome.stdout.matches(expected).count()
}

/// Check every expectation of a scenario against what its session captured.
///
/// The output expectation comes first; locals and backtrace fragments follow in declaration order. The first unmet
/// expectation is returned as a diagnosable failure carrying the expected and the captured text.
pub fn check(scenario: &Scenario, capture: &SessionCapture) -> HarnessResult<()> {
    check_output(scenario, &capture.output)?;
    check_fragments("locals", &scenario.expected_locals, capture.inspection.locals.as_deref())?;
    check_fragments("backtrace", &scenario.expected_backtrace, capture.inspection.backtrace.as_deref())
}

fn check_output(scenario: &Scenario, outcome: &SessionOutcome) -> HarnessResult<()> {
    let expected = &scenario.expected_output;

    let failure = match scenario.expected_count {
        None if verify(outcome, expected) => None,
        None => Some("to occur".to_string()),
        Some(n) => {
            let found = occurrences(outcome, expected);
            (found != n).then(|| format!("to occur exactly {n} time(s), found {found}"))
        }
    };

    match failure {
        None => {
            tracing::info!(expected = %expected, "output verified");
            Ok(())
        }
        Some(requirement) => Err(mismatch("output", expected, requirement, &outcome.stdout)),
    }
}

fn check_fragments(subject: &'static str, expected: &[String], captured: Option<&str>) -> HarnessResult<()> {
    if expected.is_empty() {
        return Ok(());
    }
    let Some(actual) = captured else {
        let requirement = "to occur, but it was never captured".to_string();
        return Err(mismatch(subject, &expected[0], requirement, ""));
    };
    for fragment in expected {
        if !actual.contains(fragment.as_str()) {
            return Err(mismatch(subject, fragment, "to occur".to_string(), actual));
        }
    }
    tracing::info!(subject, fragments = expected.len(), "inspection verified");
    Ok(())
}

fn mismatch(subject: &'static str, expected: &str, requirement: String, actual: &str) -> HarnessError {
    tracing::warn!(subject, expected = %expected, actual = %actual, "{requirement}");
    HarnessError::Verification {
        subject,
        expected: expected.to_string(),
        requirement,
        actual: actual.to_string(),
    }
}
