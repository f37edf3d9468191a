//! Harness configuration.
//!
//! Every knob of a run (debugger path, fixture directory, interpreter, timeouts) is an explicit value here and is
//! threaded through the coordinator, so scenarios never read global state.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use dapcheck_core::adapters::{self, AdapterId};
use dapcheck_core::commands::{self, CommandId, RequestClass};
use dapcheck_core::toolchains::BuildMethod;

/// Environment variable that overrides the default debugger binary path.
pub const DEBUGGER_ENV: &str = "DAPCHECK_DEBUGGER";

/// Timeouts written into the adapter registry and used to bound command invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time the debugger grants an adapter to answer `initialize`.
    pub adapter_initialize_secs: u64,
    /// Time the debugger grants any other adapter request.
    pub request_secs: u64,
    /// Default bound of an `await`.
    pub await_default_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            adapter_initialize_secs: 10,
            request_secs: 30,
            await_default_secs: 60,
        }
    }
}

/// Configuration for one harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Debugger front-end binary driven by the harness.
    pub debugger: PathBuf,
    /// Directory holding the debuggee fixtures.
    pub fixtures_dir: PathBuf,
    /// Parent directory for isolated environments.
    pub scratch_dir: PathBuf,
    /// Python interpreter used for the debugpy adapter and its probe.
    pub python: String,
    /// Adapter the debugger falls back to when `--adapter` is not passed.
    pub default_adapter: AdapterId,
    pub timeouts: Timeouts,
    /// Pause before `output` so the debuggee's stdout can reach the debugger's buffer.
    pub settle_delay: Duration,
    /// Extra wall-clock time granted to an invocation beyond its nominal bound before it is killed.
    pub invocation_grace: Duration,
    /// Compiler program overrides per build method (e.g. `clang` for native builds).
    pub compilers: BTreeMap<BuildMethod, String>,
    /// Extra adapter registry entries (`name -> (program, args)`); they win over built-in entries of the same name.
    pub extra_adapters: BTreeMap<String, (String, Vec<String>)>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            debugger: PathBuf::from("target/release/debugger"),
            fixtures_dir: PathBuf::from("fixtures"),
            scratch_dir: std::env::temp_dir(),
            python: "python3".to_string(),
            default_adapter: adapters::DEFAULT_ADAPTER,
            timeouts: Timeouts::default(),
            settle_delay: Duration::from_secs(1),
            invocation_grace: Duration::from_secs(10),
            compilers: BTreeMap::new(),
            extra_adapters: BTreeMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the debugger binary
    pub fn with_debugger(mut self, debugger: impl Into<PathBuf>) -> Self {
        self.debugger = debugger.into();
        self
    }

    /// Set the fixtures directory
    pub fn with_fixtures_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixtures_dir = dir.into();
        self
    }

    /// Set the parent directory for isolated environments
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// Set the Python interpreter
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_invocation_grace(mut self, grace: Duration) -> Self {
        self.invocation_grace = grace;
        self
    }

    /// Use `program` instead of the registry default compiler for `method`.
    pub fn with_compiler(mut self, method: BuildMethod, program: impl Into<String>) -> Self {
        self.compilers.insert(method, program.into());
        self
    }

    /// Add (or replace) an adapter entry in the registry written for every environment.
    pub fn with_adapter_entry<I, S>(mut self, name: impl Into<String>, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        self.extra_adapters.insert(name.into(), (program.into(), args));
        self
    }

    /// Wall-clock bound for one invocation of `command`.
    ///
    /// The debugger enforces its own timeouts; this bound only catches a debugger that hangs past them.
    pub fn invocation_limit(&self, command: CommandId) -> Duration {
        let nominal = match commands::class(command) {
            RequestClass::Lifecycle => self.timeouts.adapter_initialize_secs + self.timeouts.request_secs,
            RequestClass::Control | RequestClass::Inspect => self.timeouts.request_secs,
            RequestClass::Await => self.timeouts.await_default_secs,
        };
        Duration::from_secs(nominal) + self.invocation_grace
    }

    /// Wall-clock bound for a piped multi-command script.
    pub fn script_limit(&self, awaits: usize) -> Duration {
        let t = &self.timeouts;
        let secs = t.adapter_initialize_secs + t.request_secs + t.await_default_secs * awaits.max(1) as u64;
        Duration::from_secs(secs) + self.invocation_grace
    }
}
