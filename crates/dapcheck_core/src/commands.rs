//! Debugger CLI command vocabulary.
//!
//! The external debugger is driven one command per process invocation (or one command per line of a piped script).
//! This registry is the single source of truth for the command spellings the harness emits and the aliases the mock
//! debugger accepts.
//!
//! ## Notes
//! - Spellings may span several words (`breakpoint add`). Matching against a command line picks the **longest**
//!   spelling that prefixes the line, so `break remove --all` never resolves to the `break` shorthand.
//! - Matching is case-sensitive.
//!
//! ## Examples
//! ```rust
//! use dapcheck_core::commands::{self, CommandId};
//!
//! let words = ["break", "remove", "--all"];
//! assert_eq!(commands::parse_words(&words), Some((CommandId::BreakpointRemoveAll, 3)));
//!
//! let words = ["break", "main.c:7"];
//! assert_eq!(commands::parse_words(&words), Some((CommandId::BreakpointAdd, 1)));
//! ```

use super::registry::{self, ItemInfo, Stability};

/// Stable identifier for every debugger CLI command the harness knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Start,
    Stop,
    BreakpointAdd,
    BreakpointRemoveAll,
    Continue,
    Await,
    Threads,
    Locals,
    Backtrace,
    Output,
}

/// How long a command may legitimately block, which decides the timeout bound applied to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Session lifecycle (`start`, `stop`); bounded by adapter initialization plus a request.
    Lifecycle,
    /// Changes session state (`breakpoint add`, `continue`); bounded by a generic request.
    Control,
    /// Read-only inspection; bounded by a generic request.
    Inspect,
    /// Blocks on an asynchronous debug event; bounded by the await default.
    Await,
}

/// Metadata for a debugger command.
pub type CommandInfo = ItemInfo<CommandId>;

/// Registry of every command driven by the harness.
pub const COMMANDS: &[CommandInfo] = &[
    info(CommandId::Start, "start", &[], "Launch a debuggee under a new debug session."),
    info(CommandId::Stop, "stop", &[], "Terminate the active session, if any."),
    info(
        CommandId::BreakpointAdd,
        "breakpoint add",
        &["break add", "break", "b"],
        "Add a breakpoint on a symbol or `file:line`.",
    ),
    info(
        CommandId::BreakpointRemoveAll,
        "breakpoint remove --all",
        &["break remove --all"],
        "Remove every breakpoint in the session.",
    ),
    info(CommandId::Continue, "continue", &["c"], "Resume execution."),
    info(
        CommandId::Await,
        "await",
        &[],
        "Block until the next stop event (breakpoint hit or program exit).",
    ),
    info(CommandId::Threads, "threads", &[], "List debuggee threads."),
    info(CommandId::Locals, "locals", &[], "List local variables of the current frame."),
    info(CommandId::Backtrace, "bt", &["backtrace"], "Print the call stack."),
    info(CommandId::Output, "output", &[], "Print buffered debuggee stdout."),
];

/// Resolve a full spelling (canonical or alias) to a [`CommandId`].
///
/// ## Returns
/// - `Some(CommandId)` if `name` matches a spelling exactly.
/// - `None` otherwise.
pub fn from_str(name: &str) -> Option<CommandId> {
    registry::lookup(COMMANDS, name).map(|c| c.id)
}

/// Return the canonical spelling for a command.
pub fn as_str(id: CommandId) -> &'static str {
    info_for(id).canonical
}

/// Return the canonical spelling split into argv words.
///
/// ## Examples
/// ```rust
/// use dapcheck_core::commands::{self, CommandId};
///
/// assert_eq!(commands::argv(CommandId::BreakpointRemoveAll), vec!["breakpoint", "remove", "--all"]);
/// ```
pub fn argv(id: CommandId) -> Vec<&'static str> {
    as_str(id).split_whitespace().collect()
}

/// Return the full metadata entry for a command.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: CommandId) -> &'static CommandInfo {
    COMMANDS.iter().find(|c| c.id == id).expect("command info missing")
}

/// Classify a command by how long it may block.
pub fn class(id: CommandId) -> RequestClass {
    match id {
        CommandId::Start | CommandId::Stop => RequestClass::Lifecycle,
        CommandId::BreakpointAdd | CommandId::BreakpointRemoveAll | CommandId::Continue => RequestClass::Control,
        CommandId::Threads | CommandId::Locals | CommandId::Backtrace | CommandId::Output => RequestClass::Inspect,
        CommandId::Await => RequestClass::Await,
    }
}

/// Match the leading words of a command line against the registry.
///
/// ## Returns
/// - `Some((id, consumed))`: the command whose spelling is the longest word-prefix of `words`, and how many words
///   that spelling consumed. The remaining words are the command's arguments.
/// - `None` if no spelling matches.
pub fn parse_words<S: AsRef<str>>(words: &[S]) -> Option<(CommandId, usize)> {
    let mut best: Option<(CommandId, usize)> = None;

    for row in COMMANDS {
        for spelling in row.spellings() {
            let parts: Vec<&str> = spelling.split_whitespace().collect();
            if parts.len() > words.len() {
                continue;
            }
            let matches = parts.iter().zip(words).all(|(p, w)| *p == w.as_ref());
            if matches && best.is_none_or(|(_, n)| parts.len() > n) {
                best = Some((row.id, parts.len()));
            }
        }
    }

    best
}

/// Match a single script line (whitespace separated) against the registry.
pub fn parse_line(line: &str) -> Option<(CommandId, Vec<&str>)> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (id, consumed) = parse_words(&words)?;
    Some((id, words[consumed..].to_vec()))
}

const fn info(
    id: CommandId,
    canonical: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
) -> CommandInfo {
    ItemInfo {
        id,
        canonical,
        aliases,
        description,
        stability: Stability::Stable,
    }
}
