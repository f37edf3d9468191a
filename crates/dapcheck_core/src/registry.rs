//! Shareable metadata for the `dapcheck_core` registries.
//!
//! Every registry in this crate (commands, adapters, toolchains) is **registry-first**: a stable id enum plus a
//! `const` table of metadata rows. This module holds the small, dependency-free types reused across those tables.
//!
//! ## Notes
//! - These types are `Copy`-friendly so registries can live in `const` tables.
//! - Metadata is meant for tooling, reports and diagnostics; enforcement still lives in the harness.

/// Describe the lifecycle status of a vocabulary item.
///
/// ## Examples
/// ```rust
/// use dapcheck_core::registry::Stability;
///
/// let s = Stability::Stable;
/// assert_eq!(format!("{s:?}"), "Stable");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stability {
    Stable,
    /// Accepted by the debugger but not driven by the built-in suite.
    Optional,
    Deprecated,
}

/// Metadata shared by every registry row.
///
/// ## Notes
/// - `canonical` is the spelling the harness emits.
/// - `aliases` are additional accepted spellings (the mock debugger resolves them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemInfo<Id: 'static> {
    pub id: Id,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub stability: Stability,
}

impl<Id: Copy + 'static> ItemInfo<Id> {
    /// Iterate over the canonical spelling followed by every alias.
    pub fn spellings(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.canonical).chain(self.aliases.iter().copied())
    }
}

/// Find a row whose canonical spelling or alias equals `name`.
pub fn lookup<Id: Copy + 'static>(table: &'static [ItemInfo<Id>], name: &str) -> Option<&'static ItemInfo<Id>> {
    table.iter().find(|row| row.spellings().any(|s| s == name))
}
