//! Debug adapter vocabulary.
//!
//! Each adapter is registered in the debugger's configuration under a logical name and launched from a program path
//! plus arguments. Some adapters are optional on a host (they ship with a language toolchain), so the registry also
//! records how to probe for them and how to install them.
//!
//! ## Notes
//! - The canonical spelling is the name written into the adapter registry and passed as `--adapter NAME`.
//! - [`LaunchProgram::PythonInterpreter`] is resolved by the harness to the interpreter it was configured with.
//!
//! ## Examples
//! ```rust
//! use dapcheck_core::adapters::{self, AdapterId};
//!
//! assert_eq!(adapters::from_str("dlv"), Some(AdapterId::Delve));
//! assert_eq!(adapters::as_str(AdapterId::Delve), "go");
//! ```

use super::registry::{self, ItemInfo, Stability};

/// Stable identifier for every debug adapter the harness can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdapterId {
    LldbDap,
    Debugpy,
    Delve,
}

/// Which program starts an adapter (or probes for it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchProgram {
    /// A program looked up on `PATH` by name.
    Named(&'static str),
    /// The Python interpreter the harness runs with.
    PythonInterpreter,
}

/// How to launch and probe an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterLaunch {
    pub program: LaunchProgram,
    pub args: &'static [&'static str],
    /// Command whose success proves the adapter is installed; `None` means the adapter is assumed present.
    pub probe_args: Option<&'static [&'static str]>,
    pub install_hint: &'static str,
}

/// Metadata for a debug adapter.
pub type AdapterInfo = ItemInfo<AdapterId>;

/// The adapter the debugger uses when no `--adapter` is given.
pub const DEFAULT_ADAPTER: AdapterId = AdapterId::LldbDap;

/// Registry of every adapter the harness can register.
pub const ADAPTERS: &[AdapterInfo] = &[
    ItemInfo {
        id: AdapterId::LldbDap,
        canonical: "lldb-dap",
        aliases: &["lldb-vscode"],
        description: "LLVM debug adapter for native (C, Rust) targets.",
        stability: Stability::Stable,
    },
    ItemInfo {
        id: AdapterId::Debugpy,
        canonical: "debugpy",
        aliases: &["python"],
        description: "Python debug adapter, launched as `python -m debugpy.adapter`.",
        stability: Stability::Optional,
    },
    ItemInfo {
        id: AdapterId::Delve,
        canonical: "go",
        aliases: &["dlv", "delve"],
        description: "Delve debug adapter for Go targets, launched as `dlv dap`.",
        stability: Stability::Optional,
    },
];

/// Resolve a spelling to an [`AdapterId`].
pub fn from_str(name: &str) -> Option<AdapterId> {
    registry::lookup(ADAPTERS, name).map(|a| a.id)
}

/// Return the canonical (registry) name for an adapter.
pub fn as_str(id: AdapterId) -> &'static str {
    info_for(id).canonical
}

/// Return the full metadata entry for an adapter.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: AdapterId) -> &'static AdapterInfo {
    ADAPTERS.iter().find(|a| a.id == id).expect("adapter info missing")
}

/// Return launch and probe details for an adapter.
pub fn launch(id: AdapterId) -> AdapterLaunch {
    match id {
        AdapterId::LldbDap => AdapterLaunch {
            program: LaunchProgram::Named("lldb-dap"),
            args: &[],
            probe_args: None,
            install_hint: "brew install llvm (macOS) or apt install lldb (Linux)",
        },
        AdapterId::Debugpy => AdapterLaunch {
            program: LaunchProgram::PythonInterpreter,
            args: &["-m", "debugpy.adapter"],
            probe_args: Some(&["-c", "import debugpy"]),
            install_hint: "pip install debugpy",
        },
        AdapterId::Delve => AdapterLaunch {
            program: LaunchProgram::Named("dlv"),
            args: &["dap"],
            probe_args: Some(&["version"]),
            install_hint: "go install github.com/go-delve/delve/cmd/dlv@latest",
        },
    }
}
