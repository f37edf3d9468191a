//! Provide the canonical vocabulary and pure session semantics shared by the dapcheck harness and its mock debugger.
//!
//! This crate is intentionally small and dependency-free. It contains deterministic helpers that both:
//! - the harness can use to build command lines, pick timeouts and track the session state machine, and
//! - the mock debugger can use to parse the same command lines the harness emits.
//!
//! ## Notes
//!
//! - This is a “semantic core” crate: **no IO**, no global state, no process spawning.
//! - Callers work with stable ids ([`commands::CommandId`], [`adapters::AdapterId`], [`toolchains::BuildMethod`])
//!   and look up spellings/metadata via registry tables instead of hard-coding strings.
//!
//! ## Examples
//! ```rust
//! use dapcheck_core::commands::{self, CommandId};
//!
//! assert_eq!(commands::from_str("break add"), Some(CommandId::BreakpointAdd));
//! assert_eq!(commands::as_str(CommandId::BreakpointAdd), "breakpoint add");
//! ```

pub mod adapters;
pub mod commands;
pub mod protocol;
pub mod registry;
pub mod toolchains;
