//! Scenarios: one complete harness run against one debuggee language/toolchain pairing.
//!
//! The built-in suite covers a compiled native target (C), a compiled managed target (Rust), an interpreted target
//! (Python) and a garbage-collected target (Go), plus a piped-script scenario that exercises breakpoint removal.
//! Additional scenarios can be loaded from a TOML file:
//!
//! ```toml
//! [[scenario]]
//! name = "c-clang"
//! source = "hello_world.c"        # relative to the scenario file
//! build = "native"                # none | native | managed | gc-runtime
//! adapter = "lldb-dap"            # optional
//! expect = "Hello from C! Sum is 30"
//! expect_count = 1                # optional: exact number of occurrences
//! expect_locals = ["x = 10"]      # optional: substrings `locals` must show at the breakpoint
//! expect_backtrace = ["main"]     # optional: substrings `bt` must show at the breakpoint
//! start_args = []                 # optional: extra `start` arguments
//! breakpoint = "main"             # optional
//! script = ["continue", "await"]  # optional: pipe these commands instead of the stepwise protocol
//! probe = true                    # optional: defaults to true for optional adapters
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use dapcheck_core::adapters::{self, AdapterId};
use dapcheck_core::commands::{self, CommandId};
use dapcheck_core::registry::Stability;
use dapcheck_core::toolchains::{self, BuildMethod};
use serde::Deserialize;

use super::error::{HarnessError, HarnessResult};

/// Symbol the stepwise protocol breaks on when a scenario does not name one.
pub const DEFAULT_BREAKPOINT: &str = "main";

/// One immutable scenario description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub source: PathBuf,
    pub build: BuildMethod,
    /// `None` lets the debugger use its default adapter.
    pub adapter: Option<AdapterId>,
    pub expected_output: String,
    /// Exact number of occurrences required, when containment alone is not enough.
    pub expected_count: Option<usize>,
    /// Substrings the `locals` capture must contain. For scripts, checked against the transcript.
    pub expected_locals: Vec<String>,
    /// Substrings the `bt` capture must contain. For scripts, checked against the transcript.
    pub expected_backtrace: Vec<String>,
    /// Extra arguments appended to `start`.
    pub start_args: Vec<String>,
    pub breakpoint: String,
    /// Commands piped to a single debugger invocation instead of the stepwise protocol.
    pub script: Option<Vec<String>>,
    /// Check that the adapter is installed before running; absent adapters skip the scenario.
    pub probe: bool,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        build: BuildMethod,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            build,
            adapter: None,
            expected_output: expected_output.into(),
            expected_count: None,
            expected_locals: Vec::new(),
            expected_backtrace: Vec::new(),
            start_args: Vec::new(),
            breakpoint: DEFAULT_BREAKPOINT.to_string(),
            script: None,
            probe: false,
        }
    }

    /// Use a specific adapter; optional adapters are probed before the scenario runs.
    pub fn with_adapter(mut self, adapter: AdapterId) -> Self {
        self.adapter = Some(adapter);
        self.probe = adapters::info_for(adapter).stability == Stability::Optional;
        self
    }

    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_start_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.start_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_breakpoint(mut self, location: impl Into<String>) -> Self {
        self.breakpoint = location.into();
        self
    }

    pub fn with_script<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script = Some(lines.into_iter().map(Into::into).collect());
        self
    }

    pub fn expect_exactly(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }

    pub fn expect_locals<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_locals = fragments.into_iter().map(Into::into).collect();
        self
    }

    pub fn expect_backtrace<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_backtrace = fragments.into_iter().map(Into::into).collect();
        self
    }

    /// Adapter to probe before running, if any.
    pub fn probed_adapter(&self) -> Option<AdapterId> {
        if self.probe { self.adapter } else { None }
    }

    /// Directory the debugger runs in, so relative `file:line` breakpoints resolve against the source.
    pub fn working_dir(&self) -> PathBuf {
        match self.source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Check invariants that the type cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("scenario name must not be empty".to_string());
        }
        if self.expected_output.is_empty() {
            return Err(format!("scenario `{}` has an empty expected output", self.name));
        }
        if self.expected_count == Some(0) {
            return Err(format!("scenario `{}`: expect_count must be at least 1", self.name));
        }
        if self.expected_locals.iter().chain(&self.expected_backtrace).any(|f| f.is_empty()) {
            return Err(format!("scenario `{}` has an empty locals or backtrace expectation", self.name));
        }
        if let Some(script) = &self.script {
            if script.is_empty() {
                return Err(format!("scenario `{}` has an empty script", self.name));
            }
            for line in script {
                match commands::parse_line(line) {
                    None => return Err(format!("scenario `{}`: unknown command `{}`", self.name, line)),
                    Some((CommandId::Start | CommandId::Stop, _)) => {
                        return Err(format!(
                            "scenario `{}`: `{}` is issued by the harness and cannot appear in a script",
                            self.name, line
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Number of `await` commands in the script (bounds the script's wall-clock limit).
    pub fn script_awaits(&self) -> usize {
        self.script.as_deref().map_or(0, count_awaits)
    }
}

/// Number of `await` lines in a command script.
pub fn count_awaits(script: &[String]) -> usize {
    script
        .iter()
        .filter(|l| matches!(commands::parse_line(l), Some((CommandId::Await, _))))
        .count()
}

/// The built-in suite, one scenario per debuggee toolchain.
pub fn builtin_suite(fixtures_dir: &Path) -> Vec<Scenario> {
    vec![
        Scenario::new(
            "c",
            fixtures_dir.join("hello_world.c"),
            BuildMethod::CompiledNative,
            "Hello from C! Sum is 30",
        ),
        Scenario::new(
            "rust",
            fixtures_dir.join("hello_world.rs"),
            BuildMethod::CompiledManaged,
            "Hello from Rust! Sum is 30",
        ),
        Scenario::new(
            "python",
            fixtures_dir.join("hello_world.py"),
            BuildMethod::None,
            "Hello from Python! Sum is 30",
        )
        .with_adapter(AdapterId::Debugpy)
        .expect_exactly(1),
        Scenario::new(
            "go",
            fixtures_dir.join("hello_world.go"),
            BuildMethod::CompiledGcRuntime,
            "Hello from Go! Sum is 30",
        )
        .with_adapter(AdapterId::Delve),
        Scenario::new(
            "python-breakpoints",
            fixtures_dir.join("breakpoints.py"),
            BuildMethod::None,
            "Breakpoints App Finished",
        )
        .with_adapter(AdapterId::Debugpy)
        .with_script([
            "break add breakpoints.py:5",
            "break add breakpoints.py:10",
            "continue",
            "await",
            "bt --limit 5",
            "locals",
            "break remove --all",
            "continue",
            "await",
            "output",
        ]),
    ]
}

// ============================================================================
// Scenario files
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    #[serde(default)]
    scenario: Vec<RawScenario>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScenario {
    name: String,
    source: PathBuf,
    #[serde(default)]
    build: Option<String>,
    #[serde(default)]
    adapter: Option<String>,
    expect: String,
    #[serde(default)]
    expect_count: Option<usize>,
    #[serde(default)]
    expect_locals: Vec<String>,
    #[serde(default)]
    expect_backtrace: Vec<String>,
    #[serde(default)]
    start_args: Vec<String>,
    #[serde(default)]
    breakpoint: Option<String>,
    #[serde(default)]
    script: Option<Vec<String>>,
    #[serde(default)]
    probe: Option<bool>,
}

/// Parse scenario TOML; relative sources resolve against `base_dir`.
pub fn parse_scenarios(text: &str, origin: &Path, base_dir: &Path) -> HarnessResult<Vec<Scenario>> {
    let file: ScenarioFile = toml::from_str(text).map_err(|e| HarnessError::config(origin, e.to_string()))?;

    let mut scenarios = Vec::with_capacity(file.scenario.len());
    for raw in file.scenario {
        let build = match raw.build.as_deref() {
            None => BuildMethod::None,
            Some(name) => toolchains::from_str(name).ok_or_else(|| {
                HarnessError::config(origin, format!("scenario `{}`: unknown build method `{}`", raw.name, name))
            })?,
        };

        let source = if raw.source.is_absolute() {
            raw.source
        } else {
            base_dir.join(raw.source)
        };

        let mut scenario = Scenario::new(raw.name, source, build, raw.expect)
            .with_start_args(raw.start_args)
            .expect_locals(raw.expect_locals)
            .expect_backtrace(raw.expect_backtrace);
        if let Some(name) = raw.adapter.as_deref() {
            let adapter = adapters::from_str(name).ok_or_else(|| {
                HarnessError::config(origin, format!("scenario `{}`: unknown adapter `{}`", scenario.name, name))
            })?;
            scenario = scenario.with_adapter(adapter);
        }
        if let Some(probe) = raw.probe {
            scenario.probe = probe;
        }
        if let Some(bp) = raw.breakpoint {
            scenario.breakpoint = bp;
        }
        scenario.expected_count = raw.expect_count;
        scenario.script = raw.script;

        scenario.validate().map_err(|msg| HarnessError::config(origin, msg))?;
        scenarios.push(scenario);
    }

    Ok(scenarios)
}

/// Load scenarios from a TOML file.
pub fn load_scenarios(path: &Path) -> HarnessResult<Vec<Scenario>> {
    let text = fs::read_to_string(path).map_err(|e| HarnessError::config(path, e.to_string()))?;
    let base = path.parent().unwrap_or(Path::new("."));
    parse_scenarios(&text, path, base)
}

/// Reject suites whose scenario names collide (reports are keyed by name).
pub fn check_unique_names(scenarios: &[Scenario]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for s in scenarios {
        if !seen.insert(s.name.as_str()) {
            return Err(format!("duplicate scenario name `{}`", s.name));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_suite_is_valid() {
        let suite = builtin_suite(Path::new("fixtures"));
        assert_eq!(suite.len(), 5);
        check_unique_names(&suite).unwrap();
        for s in &suite {
            s.validate().unwrap();
        }
    }

    #[test]
    fn test_builtin_probes_follow_optional_adapters() {
        let suite = builtin_suite(Path::new("fixtures"));
        let probed: Vec<_> = suite.iter().filter(|s| s.probed_adapter().is_some()).map(|s| &s.name[..]).collect();
        assert_eq!(probed, vec!["python", "go", "python-breakpoints"]);
    }

    #[test]
    fn test_parse_scenario_file() {
        let text = r#"
[[scenario]]
name = "c-clang"
source = "hello_world.c"
build = "c"
expect = "Sum is 30"
expect_count = 1
expect_locals = ["x = 10", "y = 20"]
expect_backtrace = ["main"]

[[scenario]]
name = "py"
source = "/abs/hello.py"
adapter = "debugpy"
probe = false
expect = "Sum is 30"
script = ["break add hello.py:3", "continue", "await", "output"]
"#;
        let scenarios = parse_scenarios(text, Path::new("s.toml"), Path::new("/suite")).unwrap();
        assert_eq!(scenarios.len(), 2);

        assert_eq!(scenarios[0].build, BuildMethod::CompiledNative);
        assert_eq!(scenarios[0].source, PathBuf::from("/suite/hello_world.c"));
        assert_eq!(scenarios[0].expected_count, Some(1));
        assert_eq!(scenarios[0].breakpoint, "main");
        assert_eq!(scenarios[0].expected_locals, vec!["x = 10", "y = 20"]);
        assert_eq!(scenarios[0].expected_backtrace, vec!["main"]);
        assert!(scenarios[1].expected_locals.is_empty());

        assert_eq!(scenarios[1].adapter, Some(AdapterId::Debugpy));
        assert!(!scenarios[1].probe);
        assert_eq!(scenarios[1].source, PathBuf::from("/abs/hello.py"));
        assert_eq!(scenarios[1].script_awaits(), 1);
    }

    #[test]
    fn test_unknown_names_are_rejected() {
        let bad_build = "[[scenario]]\nname='x'\nsource='a'\nbuild='cobol'\nexpect='y'\n";
        let err = parse_scenarios(bad_build, Path::new("s.toml"), Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("unknown build method `cobol`"));

        let bad_adapter = "[[scenario]]\nname='x'\nsource='a'\nadapter='gdb9000'\nexpect='y'\n";
        let err = parse_scenarios(bad_adapter, Path::new("s.toml"), Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("unknown adapter `gdb9000`"));

        let unknown_field = "[[scenario]]\nname='x'\nsource='a'\nexpect='y'\ncolour='red'\n";
        assert!(parse_scenarios(unknown_field, Path::new("s.toml"), Path::new(".")).is_err());
    }

    #[test]
    fn test_script_validation() {
        let base = Scenario::new("s", "a.py", BuildMethod::None, "done");
        assert!(base.clone().with_script(["continue", "await"]).validate().is_ok());
        assert!(base.clone().with_script(["teleport"]).validate().is_err());
        assert!(base.clone().with_script(["stop"]).validate().is_err());
        assert!(base.clone().with_script(Vec::<String>::new()).validate().is_err());
        assert!(base.clone().expect_locals([""]).validate().is_err());
        assert!(base.clone().expect_backtrace(["main", ""]).validate().is_err());
        assert!(base.expect_exactly(0).validate().is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let a = Scenario::new("same", "a", BuildMethod::None, "x");
        assert!(check_unique_names(&[a.clone(), a]).is_err());
    }

    #[test]
    fn test_working_dir_is_source_parent() {
        let s = Scenario::new("s", "/fixtures/app/main.py", BuildMethod::None, "x");
        assert_eq!(s.working_dir(), PathBuf::from("/fixtures/app"));
        let bare = Scenario::new("s", "main.py", BuildMethod::None, "x");
        assert_eq!(bare.working_dir(), PathBuf::from("."));
    }
}
