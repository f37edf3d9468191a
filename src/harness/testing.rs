//! In-memory [`CommandChannel`] for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use super::channel::{CommandChannel, CommandInvocation, SessionOutcome};
use super::error::HarnessResult;

/// Replays queued replies in order and records every invocation it receives.
///
/// Once the queue is empty every further invocation succeeds with empty output.
#[derive(Debug, Default)]
pub(crate) struct ScriptedChannel {
    replies: RefCell<VecDeque<HarnessResult<SessionOutcome>>>,
    seen: RefCell<Vec<CommandInvocation>>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, outcome: SessionOutcome) -> Self {
        self.replies.borrow_mut().push_back(Ok(outcome));
        self
    }

    pub(crate) fn reply_err(self, err: super::error::HarnessError) -> Self {
        self.replies.borrow_mut().push_back(Err(err));
        self
    }

    /// Argument vectors seen so far, joined for easy comparison.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.seen.borrow().iter().map(CommandInvocation::display_args).collect()
    }

    pub(crate) fn invocations(&self) -> Vec<CommandInvocation> {
        self.seen.borrow().clone()
    }
}

impl CommandChannel for ScriptedChannel {
    async fn invoke(&self, invocation: &CommandInvocation) -> HarnessResult<SessionOutcome> {
        self.seen.borrow_mut().push(invocation.clone());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(SessionOutcome::ok("")))
    }
}
