//! Debuggee build toolchain vocabulary.
//!
//! A scenario names how its debuggee is produced. Compiled targets share one command shape,
//! `<program> <flags...> -o <output> <source>`, with flags that keep debug info reliable.
//!
//! ## Examples
//! ```rust
//! use dapcheck_core::toolchains::{self, BuildMethod};
//!
//! assert_eq!(toolchains::from_str("gc-runtime"), Some(BuildMethod::CompiledGcRuntime));
//! assert_eq!(toolchains::compiler(BuildMethod::CompiledGcRuntime).map(|c| c.program), Some("go"));
//! assert!(toolchains::compiler(BuildMethod::None).is_none());
//! ```

use super::registry::{self, ItemInfo, Stability};

/// How a debuggee source becomes something the debugger can launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BuildMethod {
    /// Interpreted source; the debuggee path is the source path.
    #[default]
    None,
    /// System C compiler with debug info.
    CompiledNative,
    /// Rust compiler with debug info.
    CompiledManaged,
    /// Go toolchain with optimizations and inlining disabled.
    CompiledGcRuntime,
}

/// Command shape for a compiled build method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compiler {
    /// Default program name (overridable by harness configuration).
    pub program: &'static str,
    /// Arguments placed before `-o <output> <source>`.
    pub flags: &'static [&'static str],
    pub install_hint: &'static str,
}

/// Metadata for a build method.
pub type BuildMethodInfo = ItemInfo<BuildMethod>;

/// Registry of build methods.
pub const BUILD_METHODS: &[BuildMethodInfo] = &[
    ItemInfo {
        id: BuildMethod::None,
        canonical: "none",
        aliases: &["interpreted"],
        description: "No build step; the source is launched directly.",
        stability: Stability::Stable,
    },
    ItemInfo {
        id: BuildMethod::CompiledNative,
        canonical: "native",
        aliases: &["c"],
        description: "Compile with the system C compiler and `-g`.",
        stability: Stability::Stable,
    },
    ItemInfo {
        id: BuildMethod::CompiledManaged,
        canonical: "managed",
        aliases: &["rust"],
        description: "Compile with `rustc -g`.",
        stability: Stability::Stable,
    },
    ItemInfo {
        id: BuildMethod::CompiledGcRuntime,
        canonical: "gc-runtime",
        aliases: &["go"],
        description: "Build with `go build -gcflags=all=-N -l` (no optimization, no inlining).",
        stability: Stability::Stable,
    },
];

/// Resolve a spelling to a [`BuildMethod`].
pub fn from_str(name: &str) -> Option<BuildMethod> {
    registry::lookup(BUILD_METHODS, name).map(|b| b.id)
}

/// Return the canonical spelling for a build method.
pub fn as_str(id: BuildMethod) -> &'static str {
    info_for(id).canonical
}

/// Return the full metadata entry for a build method.
///
/// ## Panics
/// - If the registry is missing an entry for `id` (this indicates a programming error).
pub fn info_for(id: BuildMethod) -> &'static BuildMethodInfo {
    BUILD_METHODS.iter().find(|b| b.id == id).expect("build method info missing")
}

/// Return the compiler command shape for a build method, or `None` for interpreted sources.
pub fn compiler(id: BuildMethod) -> Option<Compiler> {
    match id {
        BuildMethod::None => None,
        BuildMethod::CompiledNative => Some(Compiler {
            program: "gcc",
            flags: &["-g"],
            install_hint: "apt install gcc (Linux) or xcode-select --install (macOS)",
        }),
        BuildMethod::CompiledManaged => Some(Compiler {
            program: "rustc",
            flags: &["-g"],
            install_hint: "https://rustup.rs",
        }),
        BuildMethod::CompiledGcRuntime => Some(Compiler {
            program: "go",
            flags: &["build", "-gcflags=all=-N -l"],
            install_hint: "https://go.dev/doc/install",
        }),
    }
}
