//! Mock debugger CLI binary entry point
//!
//! Run with: mock-debugger <command> [args...]
//!
//! Stands in for a real debugger front-end in tests. It speaks the same command surface
//! (`start`, `breakpoint add`, `continue`, `await`, `locals`, `output`, `stop`, ...), keeps its
//! "daemon" state as JSON under `$XDG_RUNTIME_DIR/mock-debugger/`, and reads newline-separated
//! commands from stdin when invoked without arguments.
//!
//! Breakpoints are hit once each, in the order they were added. When no unhit breakpoint is
//! left, `continue` runs the target to completion (if it is executable) and buffers its stdout
//! for `output`.
//!
//! A `mock-debugger.toml` in the working directory injects faults:
//!
//! ```toml
//! fail = ["start"]       # these commands exit 2
//! hang = ["await"]       # these commands never return
//! await_timeout = true   # `await` reports a timeout
//! ```

use std::env;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::{self, Command};
use std::thread;
use std::time::Duration;

use dapcheck::harness::environment::{APP_CONFIG_DIR, AdapterRegistry, CONFIG_ROOT_VAR, REGISTRY_FILE, RUNTIME_ROOT_VAR};
use dapcheck_core::commands::{self, CommandId};
use serde::{Deserialize, Serialize};

const STATE_DIR: &str = "mock-debugger";
const STATE_FILE: &str = "session.json";
const FAULTS_FILE: &str = "mock-debugger.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Phase {
    StoppedAtEntry,
    Running,
    StoppedAtBreakpoint,
    Exited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
enum Pending {
    Stop(String),
    Exit(i32),
}

#[derive(Debug, Serialize, Deserialize)]
struct Session {
    target: PathBuf,
    target_args: Vec<String>,
    adapter: String,
    phase: Phase,
    breakpoints: Vec<String>,
    hit: Vec<String>,
    pending: Option<Pending>,
    ran: bool,
    output: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Faults {
    fail: Vec<String>,
    hang: Vec<String>,
    await_timeout: bool,
}

/// A failed command: message for stderr plus the exit code.
struct Failure(String, i32);

type Outcome = Result<String, Failure>;

fn fail<T>(message: impl Into<String>) -> Result<T, Failure> {
    Err(Failure(message.into(), 1))
}

struct Daemon {
    state_path: PathBuf,
    config_root: PathBuf,
    faults: Faults,
}

impl Daemon {
    fn from_env() -> Result<Self, Failure> {
        let runtime = env::var_os(RUNTIME_ROOT_VAR).map(PathBuf::from);
        let config = env::var_os(CONFIG_ROOT_VAR).map(PathBuf::from);
        let (Some(runtime), Some(config_root)) = (runtime, config) else {
            return fail(format!("{RUNTIME_ROOT_VAR} and {CONFIG_ROOT_VAR} must be set"));
        };
        if !runtime.is_dir() {
            return fail(format!("runtime directory {} does not exist", runtime.display()));
        }

        let faults = match fs::read_to_string(FAULTS_FILE) {
            Ok(text) => toml::from_str(&text).map_err(|e| Failure(format!("bad {FAULTS_FILE}: {e}"), 1))?,
            Err(_) => Faults::default(),
        };

        Ok(Self {
            state_path: runtime.join(STATE_DIR).join(STATE_FILE),
            config_root,
            faults,
        })
    }

    fn load(&self) -> Result<Option<Session>, Failure> {
        match fs::read_to_string(&self.state_path) {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| Failure(format!("corrupt session state: {e}"), 1)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => fail(format!("cannot read session state: {e}")),
        }
    }

    fn save(&self, session: &Session) -> Result<(), Failure> {
        let write = || -> io::Result<()> {
            if let Some(dir) = self.state_path.parent() {
                fs::create_dir_all(dir)?;
            }
            let text = serde_json::to_string_pretty(session).map_err(io::Error::from)?;
            fs::write(&self.state_path, text)
        };
        write().map_err(|e| Failure(format!("cannot write session state: {e}"), 1))
    }

    fn clear(&self) -> Result<(), Failure> {
        match fs::remove_file(&self.state_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => fail(format!("cannot clear session state: {e}")),
        }
    }

    fn session(&self) -> Result<Session, Failure> {
        self.load()?.map_or_else(|| fail("no active session (run `start` first)"), Ok)
    }

    fn registry(&self) -> Result<AdapterRegistry, Failure> {
        let path = self.config_root.join(APP_CONFIG_DIR).join(REGISTRY_FILE);
        let text = fs::read_to_string(&path).map_err(|e| Failure(format!("cannot read {}: {e}", path.display()), 1))?;
        AdapterRegistry::from_toml(&path, &text).map_err(|e| Failure(e.to_string(), 1))
    }

    /// Run one command line (already split into words).
    fn execute(&self, words: &[String]) -> Outcome {
        let Some((id, consumed)) = commands::parse_words(words) else {
            return fail(format!("unknown command: {}", words.join(" ")));
        };
        let args = &words[consumed..];
        let name = commands::as_str(id);

        if self.faults.hang.iter().any(|c| c == name) {
            loop {
                thread::sleep(Duration::from_secs(3600));
            }
        }
        if self.faults.fail.iter().any(|c| c == name) {
            return Err(Failure(format!("injected failure for `{name}`"), 2));
        }

        match id {
            CommandId::Start => self.start(args),
            CommandId::Stop => self.stop(),
            CommandId::BreakpointAdd => self.with_session(|s| {
                let Some(location) = args.first() else {
                    return fail("breakpoint add needs a location");
                };
                if matches!(s.phase, Phase::Running | Phase::Exited) {
                    return fail("cannot set breakpoints while the program is not stopped");
                }
                s.breakpoints.push(location.clone());
                Ok(format!("Breakpoint {} set at {}", s.breakpoints.len(), location))
            }),
            CommandId::BreakpointRemoveAll => self.with_session(|s| {
                let n = s.breakpoints.len();
                s.breakpoints.clear();
                Ok(format!("Removed {n} breakpoint(s)"))
            }),
            CommandId::Continue => self.with_session(continue_session),
            CommandId::Await => self.with_session(|s| self.await_event(s)),
            CommandId::Threads => self.with_stopped(|_| Ok("* Thread 1 (main)".to_string())),
            CommandId::Locals => self.with_stopped(|_| Ok("x = 10\ny = 20".to_string())),
            CommandId::Backtrace => self.with_stopped(|s| {
                let frame = s.hit.last().cloned().unwrap_or_else(|| "<entry>".to_string());
                Ok(format!("#0 {} in {}", frame, s.target.display()))
            }),
            CommandId::Output => self.with_session(|s| Ok(s.output.clone())),
        }
    }

    fn start(&self, args: &[String]) -> Outcome {
        if self.load()?.is_some() {
            return fail("a session is already active (run `stop` first)");
        }
        let registry = self.registry()?;

        let mut target = None;
        let mut adapter = registry.defaults.adapter.clone();
        let mut target_args = Vec::new();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--stop-on-entry" => {}
                "--adapter" => {
                    let Some(name) = iter.next() else {
                        return fail("--adapter needs a name");
                    };
                    adapter = name.clone();
                }
                "--" => target_args.extend(iter.by_ref().cloned()),
                _ if target.is_none() => target = Some(PathBuf::from(arg)),
                _ => target_args.push(arg.clone()),
            }
        }

        let Some(target) = target else {
            return fail("start needs a target");
        };
        if !target.exists() {
            return fail(format!("target {} does not exist", target.display()));
        }
        if adapter != registry.defaults.adapter && !registry.adapters.contains_key(&adapter) {
            return fail(format!("unknown adapter `{adapter}`"));
        }

        let session = Session {
            target: target.clone(),
            target_args,
            adapter: adapter.clone(),
            phase: Phase::StoppedAtEntry,
            breakpoints: Vec::new(),
            hit: Vec::new(),
            pending: None,
            ran: false,
            output: String::new(),
        };
        self.save(&session)?;
        Ok(format!("Started {} with {} (stopped on entry)", target.display(), adapter))
    }

    fn stop(&self) -> Outcome {
        if self.load()?.is_none() {
            return Ok("No active session".to_string());
        }
        self.clear()?;
        Ok("Session stopped".to_string())
    }

    fn await_event(&self, s: &mut Session) -> Outcome {
        if self.faults.await_timeout {
            return fail("await timed out waiting for a stop event");
        }
        match s.phase {
            Phase::Exited => return fail("program already exited"),
            Phase::Running => {}
            _ => return fail("program is not running"),
        }
        match s.pending.take() {
            Some(Pending::Stop(location)) => {
                s.phase = Phase::StoppedAtBreakpoint;
                s.hit.push(location.clone());
                Ok(format!("Stopped at breakpoint: {location}"))
            }
            Some(Pending::Exit(code)) => {
                s.phase = Phase::Exited;
                Ok(format!("Program exited with code {code}"))
            }
            None => fail("program is running but no event is pending"),
        }
    }

    fn with_session(&self, f: impl FnOnce(&mut Session) -> Outcome) -> Outcome {
        let mut session = self.session()?;
        let result = f(&mut session);
        self.save(&session)?;
        result
    }

    fn with_stopped(&self, f: impl FnOnce(&Session) -> Outcome) -> Outcome {
        let session = self.session()?;
        if !matches!(session.phase, Phase::StoppedAtEntry | Phase::StoppedAtBreakpoint) {
            return fail("program is not stopped");
        }
        f(&session)
    }
}

fn continue_session(s: &mut Session) -> Outcome {
    if !matches!(s.phase, Phase::StoppedAtEntry | Phase::StoppedAtBreakpoint) {
        return fail("program is not stopped");
    }
    s.phase = Phase::Running;

    let next = s.breakpoints.iter().find(|b| !s.hit.contains(b)).cloned();
    s.pending = Some(match next {
        Some(location) => Pending::Stop(location),
        None => Pending::Exit(run_target(s)),
    });
    Ok("Continuing".to_string())
}

/// Run the debuggee once and buffer its stdout. Non-executable targets produce no output.
fn run_target(s: &mut Session) -> i32 {
    if s.ran {
        return 0;
    }
    s.ran = true;
    if !is_executable(&s.target) {
        return 0;
    }
    match Command::new(&s.target).args(&s.target_args).output() {
        Ok(out) => {
            s.output.push_str(&String::from_utf8_lossy(&out.stdout));
            out.status.code().unwrap_or(-1)
        }
        Err(_) => -1,
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "exe")
}

fn run_words(daemon: &Daemon, words: &[String]) -> bool {
    match daemon.execute(words) {
        Ok(out) => {
            if !out.is_empty() {
                println!("{out}");
            }
            true
        }
        Err(Failure(message, _)) => {
            eprintln!("Error: {message}");
            false
        }
    }
}

fn main() {
    let daemon = match Daemon::from_env() {
        Ok(d) => d,
        Err(Failure(message, code)) => {
            eprintln!("Error: {message}");
            process::exit(code);
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    if !args.is_empty() {
        match daemon.execute(&args) {
            Ok(out) => {
                if !out.is_empty() {
                    println!("{out}");
                }
            }
            Err(Failure(message, code)) => {
                eprintln!("Error: {message}");
                process::exit(code);
            }
        }
        return;
    }

    // Script mode: one command per line, in order, until end of input.
    let mut all_ok = true;
    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if words.is_empty() || words[0].starts_with('#') {
            continue;
        }
        println!("> {}", words.join(" "));
        all_ok &= run_words(&daemon, &words);
    }
    if !all_ok {
        process::exit(1);
    }
}
