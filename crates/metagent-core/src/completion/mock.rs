//! Scripted Completion Client
//!
//! Deterministic stand-in for tests and offline demos: replays a
//! programmed queue of replies and records every call it receives.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatTurn, CompletionClient};
use crate::error::{AgentError, Result};

/// One observed `complete` call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system: String,
    pub turns: Vec<ChatTurn>,
    pub temperature: f32,
}

/// Completion client that replays scripted replies in order.
///
/// An exhausted queue fails the call, which doubles as a guard against
/// tests that trigger more completions than they meant to.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    #[must_use]
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .push_back(Ok(content.into()));
        self
    }

    /// Queue a failed call
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .expect("reply queue poisoned")
            .push_back(Err(message.into()));
        self
    }

    /// Number of `complete` calls observed so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("call log poisoned").len()
    }

    /// The nth observed call, if it happened
    pub fn call(&self, index: usize) -> Option<RecordedCall> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .get(index)
            .cloned()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, system: &str, turns: &[ChatTurn], temperature: f32) -> Result<String> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(RecordedCall {
                system: system.to_string(),
                turns: turns.to_vec(),
                temperature,
            });

        match self
            .replies
            .lock()
            .expect("reply queue poisoned")
            .pop_front()
        {
            Some(Ok(content)) => Ok(content),
            Some(Err(message)) => Err(AgentError::Completion(message)),
            None => Err(AgentError::Completion(
                "no scripted reply left in the queue".into(),
            )),
        }
    }
}
