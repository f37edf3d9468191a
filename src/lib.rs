#![forbid(unsafe_code)]
//! dapcheck: multi-target debug-session orchestration and verification.
//!
//! The harness drives an external debugger CLI through scripted sessions against debuggees built from several
//! toolchains, and checks that what the debugger reports matches fixed expectations.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` and `harness` modules
//!   enforce `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: Registry lookups in `dapcheck_core` use `.expect(...)` for entries that must exist; a
//!   failure there is a bug in the registry table.

pub mod cli;
pub mod harness;
pub mod version;

pub use harness::{
    HarnessConfig, HarnessError, ProcessChannel, RunCoordinator, RunReport, Scenario, builtin_suite, load_scenarios,
};
