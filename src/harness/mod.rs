//! The harness proper: provision, build, drive, verify, tear down.
//!
//! Data flows strictly downward:
//!
//! ```text
//! RunCoordinator -> SessionController -> CommandChannel
//!        |                  ^
//!        +-> Provisioner ---+   (one isolated environment per scenario)
//!        +-> ToolchainBuilder   (one debuggee per scenario)
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod channel;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod environment;
pub mod error;
pub mod report;
pub mod scenario;
pub mod toolchain;
pub mod verifier;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{CommandChannel, CommandInvocation, ProcessChannel, SessionOutcome};
pub use config::{HarnessConfig, Timeouts};
pub use controller::{Inspection, SessionCapture, SessionController};
pub use coordinator::RunCoordinator;
pub use environment::{IsolatedEnvironment, Provisioner};
pub use error::{ErrorKind, HarnessError, HarnessResult};
pub use report::{RunReport, RunReporter, ScenarioResult, ScenarioStatus};
pub use scenario::{Scenario, builtin_suite, load_scenarios};
pub use toolchain::{ProbeReport, ToolchainBuilder};
