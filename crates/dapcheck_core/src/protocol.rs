//! Session protocol state machine.
//!
//! A debug session moves through a fixed set of states, one transition per command invocation:
//!
//! ```text
//! Unstarted -start-> StoppedAtEntry -continue-> Running -await-> StoppedAtBreakpoint -continue-> Running
//!                                                       -await-> Exited
//! ```
//!
//! `stop` returns to `Unstarted` from anywhere. Inspection commands and breakpoint edits keep the session where it
//! is. `await` on an already exited session stays `Exited` (the debugger may report it as a failure; callers tolerate
//! that).
//!
//! ## Examples
//! ```rust
//! use dapcheck_core::commands::CommandId;
//! use dapcheck_core::protocol::{self, SessionState};
//!
//! assert_eq!(
//!     protocol::successors(SessionState::Unstarted, CommandId::Start),
//!     &[SessionState::StoppedAtEntry]
//! );
//! assert!(protocol::successors(SessionState::Unstarted, CommandId::Continue).is_empty());
//! ```

use super::commands::CommandId;

/// Observable state of one debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Unstarted,
    StoppedAtEntry,
    Running,
    StoppedAtBreakpoint,
    Exited,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self == SessionState::Exited
    }
}

/// Return the states a session may be in after `command` succeeds from `from`.
///
/// ## Returns
/// - An empty slice when the command is not legal from `from`.
/// - Exactly one state for deterministic commands; two for `await` from `Running`.
pub fn successors(from: SessionState, command: CommandId) -> &'static [SessionState] {
    use SessionState::*;

    match (command, from) {
        (CommandId::Stop, _) => &[Unstarted],
        (CommandId::Start, Unstarted) => &[StoppedAtEntry],
        (CommandId::BreakpointAdd | CommandId::BreakpointRemoveAll, StoppedAtEntry) => &[StoppedAtEntry],
        (CommandId::BreakpointAdd | CommandId::BreakpointRemoveAll, StoppedAtBreakpoint) => &[StoppedAtBreakpoint],
        (CommandId::Continue, StoppedAtEntry | StoppedAtBreakpoint) => &[Running],
        (CommandId::Await, Running) => &[StoppedAtBreakpoint, Exited],
        (CommandId::Await, Exited) => &[Exited],
        (CommandId::Threads | CommandId::Locals | CommandId::Backtrace, StoppedAtEntry) => &[StoppedAtEntry],
        (CommandId::Threads | CommandId::Locals | CommandId::Backtrace, StoppedAtBreakpoint) => {
            &[StoppedAtBreakpoint]
        }
        (CommandId::Output, Exited) => &[Exited],
        _ => &[],
    }
}

/// Whether `to` is a legal result of running `command` from `from`.
pub fn is_legal(from: SessionState, command: CommandId, to: SessionState) -> bool {
    successors(from, command).contains(&to)
}

/// Line prefixes the debugger prints when an `await` observed program termination.
pub const EXIT_LINE_PREFIXES: &[&str] = &["Program exited", "Program terminated"];

/// Decide which state an `await` reached from its captured stdout.
///
/// ## Notes
/// - Only a line that *starts* with one of [`EXIT_LINE_PREFIXES`] (after leading whitespace) counts as an exit.
///   Stop reports carry source paths and exception descriptions, which may mention "exited" anywhere.
/// - Anything else is a stop.
///
/// ## Examples
/// ```rust
/// use dapcheck_core::protocol::{classify_await, SessionState};
///
/// assert_eq!(classify_await("Program exited with code 0"), SessionState::Exited);
/// let stop = "Stopped at breakpoint\n  Location: /srv/terminated/app.c:4";
/// assert_eq!(classify_await(stop), SessionState::StoppedAtBreakpoint);
/// ```
pub fn classify_await(stdout: &str) -> SessionState {
    let exited = stdout
        .lines()
        .map(str::trim_start)
        .any(|line| EXIT_LINE_PREFIXES.iter().any(|p| line.starts_with(p)));
    if exited {
        SessionState::Exited
    } else {
        SessionState::StoppedAtBreakpoint
    }
}
