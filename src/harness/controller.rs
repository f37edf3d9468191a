//! Session controller: drives one debug session through the command protocol.
//!
//! ```text
//! stop -> start --stop-on-entry -> breakpoint add -> continue -> await
//!      -> threads, locals, bt -> continue -> await -> (settle) -> output
//! ```
//!
//! Every step is one [`CommandInvocation`]. The controller tracks the [`SessionState`] the debugger should be in and
//! refuses to send a command that is not legal from it, so a broken sequence fails loudly instead of confusing the
//! daemon.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use dapcheck_core::adapters::{self, AdapterId};
use dapcheck_core::commands::{self, CommandId};
use dapcheck_core::protocol::{self, SessionState};

use super::channel::{CommandChannel, CommandInvocation, SessionOutcome};
use super::config::HarnessConfig;
use super::error::{HarnessError, HarnessResult};
use super::scenario::{self, Scenario};

/// Marker the debugger prints when its own `await` bound expired.
const AWAIT_TIMEOUT_MARKER: &str = "timed out";

/// Captured text of the read-only inspection step. `None` means the command failed or never ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inspection {
    pub threads: Option<String>,
    pub locals: Option<String>,
    pub backtrace: Option<String>,
}

impl Inspection {
    /// A piped script interleaves every command's output in one transcript; each inspection command the script
    /// issued is credited with the whole transcript.
    fn from_transcript(script: &[String], transcript: &str) -> Self {
        let issued = |wanted: CommandId| {
            script
                .iter()
                .any(|l| matches!(commands::parse_line(l), Some((id, _)) if id == wanted))
                .then(|| transcript.to_string())
        };
        Self {
            threads: issued(CommandId::Threads),
            locals: issued(CommandId::Locals),
            backtrace: issued(CommandId::Backtrace),
        }
    }
}

/// Everything one session captured for verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCapture {
    /// The `output` command's outcome, or the whole piped script's.
    pub output: SessionOutcome,
    /// Empty when the debuggee exited before the breakpoint.
    pub inspection: Inspection,
}

/// Sequences debugger commands for one scenario.
pub struct SessionController<'a, C: CommandChannel> {
    channel: &'a C,
    config: &'a HarnessConfig,
    env_overrides: Vec<(String, OsString)>,
    working_dir: PathBuf,
    state: SessionState,
}

impl<'a, C: CommandChannel> SessionController<'a, C> {
    pub fn new(
        channel: &'a C,
        config: &'a HarnessConfig,
        env_overrides: Vec<(String, OsString)>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            channel,
            config,
            env_overrides,
            working_dir: working_dir.into(),
            state: SessionState::Unstarted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the full protocol for `scenario` against the built debuggee and return what it captured.
    ///
    /// Scenarios with a script hand the script to one invocation after `start`; everything else follows the
    /// stepwise protocol and captures the inspection at the breakpoint plus the `output` command's outcome.
    pub async fn drive(&mut self, scenario: &Scenario, target: &Path) -> HarnessResult<SessionCapture> {
        self.stop().await;
        self.start(target, scenario.adapter, &scenario.start_args).await?;

        if let Some(script) = &scenario.script {
            let output = self.run_script(script).await?;
            let inspection = Inspection::from_transcript(script, &output.stdout);
            return Ok(SessionCapture { output, inspection });
        }

        self.add_breakpoint(&scenario.breakpoint).await?;
        self.continue_execution().await?;

        let mut inspection = Inspection::default();
        match self.await_event().await? {
            SessionState::StoppedAtBreakpoint => {
                inspection = self.inspect().await;
                self.continue_execution().await?;
                self.await_exit().await?;
            }
            _ => {
                tracing::warn!(breakpoint = %scenario.breakpoint, "debuggee exited before reaching the breakpoint");
            }
        }

        let output = self.fetch_output().await?;
        Ok(SessionCapture { output, inspection })
    }

    /// Best-effort `stop`. Never fails: with no session running the debugger may report an error, which is ignored.
    pub async fn stop(&mut self) {
        let invocation = self.invocation(CommandId::Stop, Vec::new());
        match self.channel.invoke(&invocation).await {
            Ok(outcome) if !outcome.success => {
                tracing::debug!(stderr = %outcome.stderr, "stop reported failure (no session running)");
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "stop could not be delivered"),
        }
        self.state = SessionState::Unstarted;
    }

    /// `start <target> --stop-on-entry [--adapter NAME] [args...]`.
    pub async fn start(&mut self, target: &Path, adapter: Option<AdapterId>, extra: &[String]) -> HarnessResult<()> {
        let mut args: Vec<OsString> = vec![target.into(), "--stop-on-entry".into()];
        if let Some(adapter) = adapter {
            args.push("--adapter".into());
            args.push(adapters::as_str(adapter).into());
        }
        args.extend(extra.iter().map(OsString::from));

        self.step(CommandId::Start, args).await?;
        Ok(())
    }

    pub async fn add_breakpoint(&mut self, location: &str) -> HarnessResult<()> {
        self.step(CommandId::BreakpointAdd, vec![location.into()]).await?;
        Ok(())
    }

    pub async fn continue_execution(&mut self) -> HarnessResult<()> {
        self.step(CommandId::Continue, Vec::new()).await?;
        Ok(())
    }

    /// `await` for the next stop or exit. A failure here fails the scenario.
    ///
    /// ## Errors
    ///
    /// - [`HarnessError::Timeout`] if the debugger's own await bound expired (or the invocation outlived its
    ///   wall-clock limit).
    /// - [`HarnessError::Protocol`] for any other non-zero exit.
    pub async fn await_event(&mut self) -> HarnessResult<SessionState> {
        self.check_legal(CommandId::Await)?;
        let invocation = self.await_invocation();
        let outcome = self.channel.invoke(&invocation).await?;

        if !outcome.success {
            if outcome.stderr.to_lowercase().contains(AWAIT_TIMEOUT_MARKER) {
                return Err(HarnessError::Timeout {
                    command: invocation.display_args(),
                    secs: self.config.timeouts.await_default_secs,
                });
            }
            return Err(protocol_failure(&invocation, &outcome));
        }

        let reached = protocol::classify_await(&outcome.stdout);
        self.transition(CommandId::Await, reached)?;
        tracing::info!(state = ?reached, "await returned");
        Ok(reached)
    }

    /// `await` for program exit after the last `continue`.
    ///
    /// A session that already terminated may report the await as failed; that is tolerated and the session is taken
    /// to have exited. A debuggee that stops again instead of exiting is a protocol failure.
    pub async fn await_exit(&mut self) -> HarnessResult<()> {
        self.check_legal(CommandId::Await)?;
        let invocation = self.await_invocation();
        let outcome = self.channel.invoke(&invocation).await?;

        if !outcome.success {
            tracing::info!(
                exit_code = ?outcome.exit_code,
                "final await reported failure (program may have already exited)"
            );
            self.state = SessionState::Exited;
            return Ok(());
        }

        match protocol::classify_await(&outcome.stdout) {
            SessionState::Exited => {
                self.state = SessionState::Exited;
                Ok(())
            }
            _ => Err(HarnessError::Protocol {
                command: invocation.display_args(),
                exit_code: outcome.exit_code,
                stderr: format!("expected the debuggee to exit, but it stopped again:\n{}", outcome.stdout),
            }),
        }
    }

    /// Read-only `threads`, `locals` and `bt`. Failures are logged here; whether a missing capture matters is up to
    /// the scenario's expectations.
    pub async fn inspect(&mut self) -> Inspection {
        Inspection {
            threads: self.inspect_one(CommandId::Threads).await,
            locals: self.inspect_one(CommandId::Locals).await,
            backtrace: self.inspect_one(CommandId::Backtrace).await,
        }
    }

    /// Wait for output to flush, then fetch the debuggee's buffered stdout.
    pub async fn fetch_output(&mut self) -> HarnessResult<SessionOutcome> {
        self.check_legal(CommandId::Output)?;
        tokio::time::sleep(self.config.settle_delay).await;
        self.step(CommandId::Output, Vec::new()).await
    }

    /// Pipe `script` into one debugger invocation and return its outcome.
    ///
    /// The script is checked against the state machine before anything is sent. A non-zero exit is not an error
    /// here; the captured stdout is what gets verified.
    pub async fn run_script(&mut self, script: &[String]) -> HarnessResult<SessionOutcome> {
        let possible = plan_script(self.state, script)?;

        let awaits = scenario::count_awaits(script);
        let mut body = script.join("\n");
        body.push('\n');

        let invocation = CommandInvocation::new(Vec::<OsString>::new(), self.working_dir.clone())
            .with_env(self.env_overrides.clone())
            .with_stdin_script(body)
            .with_time_limit(self.config.script_limit(awaits));

        tracing::info!(lines = script.len(), "piping command script");
        let outcome = self.channel.invoke(&invocation).await?;
        if !outcome.success {
            tracing::warn!(exit_code = ?outcome.exit_code, "command script exited non-zero");
        }

        self.state = match possible.as_slice() {
            [only] => *only,
            _ => protocol::classify_await(&outcome.stdout),
        };
        Ok(outcome)
    }

    // ------------------------------------------------------------------------

    fn invocation(&self, id: CommandId, extra: Vec<OsString>) -> CommandInvocation {
        let mut args: Vec<OsString> = commands::argv(id).into_iter().map(OsString::from).collect();
        args.extend(extra);
        CommandInvocation::new(args, self.working_dir.clone())
            .with_env(self.env_overrides.clone())
            .with_time_limit(self.config.invocation_limit(id))
    }

    fn await_invocation(&self) -> CommandInvocation {
        let secs = self.config.timeouts.await_default_secs.to_string();
        self.invocation(CommandId::Await, vec!["--timeout".into(), secs.into()])
    }

    /// Send a deterministic command that must succeed.
    async fn step(&mut self, id: CommandId, extra: Vec<OsString>) -> HarnessResult<SessionOutcome> {
        self.check_legal(id)?;
        let invocation = self.invocation(id, extra);
        let outcome = self.channel.invoke(&invocation).await?;
        if !outcome.success {
            return Err(protocol_failure(&invocation, &outcome));
        }
        if let [next] = protocol::successors(self.state, id) {
            self.transition(id, *next)?;
        }
        Ok(outcome)
    }

    async fn inspect_one(&mut self, id: CommandId) -> Option<String> {
        if let Err(e) = self.check_legal(id) {
            tracing::warn!(error = %e, "skipping inspection");
            return None;
        }
        let invocation = self.invocation(id, Vec::new());
        match self.channel.invoke(&invocation).await {
            Ok(outcome) if outcome.success => {
                tracing::info!(command = commands::as_str(id), "\n{}", outcome.stdout);
                Some(outcome.stdout)
            }
            Ok(outcome) => {
                tracing::warn!(command = commands::as_str(id), stderr = %outcome.stderr, "inspection failed");
                None
            }
            Err(e) => {
                tracing::warn!(command = commands::as_str(id), error = %e, "inspection failed");
                None
            }
        }
    }

    fn check_legal(&self, id: CommandId) -> HarnessResult<()> {
        if protocol::successors(self.state, id).is_empty() {
            return Err(HarnessError::OutOfOrder {
                command: commands::as_str(id).to_string(),
                state: format!("{:?}", self.state),
            });
        }
        Ok(())
    }

    fn transition(&mut self, id: CommandId, to: SessionState) -> HarnessResult<()> {
        if !protocol::is_legal(self.state, id, to) {
            return Err(HarnessError::OutOfOrder {
                command: commands::as_str(id).to_string(),
                state: format!("{:?}", self.state),
            });
        }
        self.state = to;
        Ok(())
    }
}

fn protocol_failure(invocation: &CommandInvocation, outcome: &SessionOutcome) -> HarnessError {
    HarnessError::Protocol {
        command: invocation.display_args(),
        exit_code: outcome.exit_code,
        stderr: outcome.stderr.clone(),
    }
}

/// Walk a script through the state machine, tracking every state the session could be in.
///
/// ## Returns
/// The set of states the session may be in after the last line.
///
/// ## Errors
/// [`HarnessError::OutOfOrder`] naming the first line that is legal from none of the possible states, or
/// [`HarnessError::Protocol`] for a line that is not a known command.
pub fn plan_script(from: SessionState, script: &[String]) -> HarnessResult<Vec<SessionState>> {
    let mut possible = vec![from];
    for line in script {
        let Some((id, _)) = commands::parse_line(line) else {
            return Err(HarnessError::Protocol {
                command: line.clone(),
                exit_code: None,
                stderr: "unknown command".to_string(),
            });
        };
        let mut next = Vec::new();
        for state in &possible {
            for &s in protocol::successors(*state, id) {
                if !next.contains(&s) {
                    next.push(s);
                }
            }
        }
        if next.is_empty() {
            return Err(HarnessError::OutOfOrder {
                command: line.clone(),
                state: format!("{possible:?}"),
            });
        }
        possible = next;
    }
    Ok(possible)
}
