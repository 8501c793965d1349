//! Completion Collaborator
//!
//! The single seam between the orchestration core and whatever chat
//! completion service backs it. The core never constructs a client:
//! callers inject one, or inject none and get the deterministic
//! fallback behavior everywhere a completion would have been used.

mod mock;

pub use mock::{RecordedCall, ScriptedCompletion};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role of a conversation turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input (and few-shot example prompts)
    User,
    /// Assistant output (and few-shot example replies)
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn handed to the completion backend.
///
/// The system context travels separately (see [`CompletionClient::complete`]),
/// so turns only ever carry user and assistant roles.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Chat completion collaborator contract.
///
/// Implementations make exactly one attempt per call. A transport
/// failure, a non-success status, or empty content all surface as an
/// error; retries and fallbacks belong to the caller.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Request one completion for the given system context and turns.
    async fn complete(&self, system: &str, turns: &[ChatTurn], temperature: f32) -> Result<String>;
}

/// Parse model output as JSON, recovering from decorated payloads.
///
/// Models frequently wrap JSON in code fences or prose. First attempt a
/// strict parse; if that fails, retry on the substring spanning the
/// first `{` through the last `}`. Anything else is unusable.
pub(crate) fn parse_json_with_recovery<T>(content: &str) -> Option<T>
where
    T: serde::de::DeserializeOwned,
{
    if let Ok(parsed) = serde_json::from_str(content) {
        return Some(parsed);
    }
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_turn_constructors() {
        let turn = ChatTurn::user("hello");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "hello");

        let turn = ChatTurn::assistant("hi");
        assert_eq!(turn.role, Role::Assistant);
    }

    #[test]
    fn test_parse_strict_json() {
        let parsed: Option<Value> = parse_json_with_recovery(r#"{"steps": []}"#);
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_recovers_fenced_json() {
        let content = "```json\n{\"steps\": [{\"title\": \"a\"}]}\n```";
        let parsed: Option<Value> = parse_json_with_recovery(content);
        let parsed = parsed.unwrap();
        assert_eq!(parsed["steps"][0]["title"], "a");
    }

    #[test]
    fn test_parse_recovers_json_inside_prose() {
        let content = "Here is the plan: {\"steps\": []} and that should work.";
        let parsed: Option<Value> = parse_json_with_recovery(content);
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let parsed: Option<Value> = parse_json_with_recovery("no json here at all");
        assert!(parsed.is_none());

        let parsed: Option<Value> = parse_json_with_recovery("{truncated");
        assert!(parsed.is_none());
    }
}
