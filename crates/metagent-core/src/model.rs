//! Agent Data Model
//!
//! Persisted and wire-facing types: agent definitions, per-call tool
//! traces, and the terminal task result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tools::ToolName;

/// A tool granted to an agent, with normalized configuration parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Member of the closed tool set
    pub name: ToolName,

    /// Why this agent carries the tool (shown to planning prompts)
    #[serde(default)]
    pub description: String,

    /// Tool-specific parameters, normalized before storage
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl ToolConfig {
    pub fn new(name: ToolName, description: impl Into<String>) -> Self {
        Self {
            name,
            description: description.into(),
            parameters: Map::new(),
        }
    }

    /// Attach a parameter value
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Capability summary of one member inside a composite agent
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubAgentSummary {
    /// Present when the member also exists as a standalone agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tools: Vec<ToolName>,
}

/// A synthesized agent: persona, instructions, and granted tools
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Stable identifier (UUID v4, assigned at synthesis)
    pub agent_id: String,

    pub name: String,
    pub description: String,

    /// System prompt used for every completion made on the agent's behalf
    pub prompt: String,

    #[serde(default)]
    pub tools: Vec<ToolConfig>,

    pub created_at: DateTime<Utc>,

    /// Composite agents run the multi-step orchestration flow
    #[serde(default)]
    pub is_composite: bool,

    /// Informational member listing for composite agents
    #[serde(default)]
    pub sub_agents: Vec<SubAgentSummary>,
}

/// List projection of an agent definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub tools: Vec<ToolName>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_composite: bool,
}

impl From<&AgentDefinition> for AgentSummary {
    fn from(agent: &AgentDefinition) -> Self {
        Self {
            agent_id: agent.agent_id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            tools: agent.tools.iter().map(|tool| tool.name).collect(),
            created_at: agent.created_at,
            is_composite: agent.is_composite,
        }
    }
}

/// Record of one tool invocation within a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallTrace {
    pub tool: ToolName,

    /// Query string handed to the tool
    pub input: String,

    /// Tool output; empty for failed calls
    #[serde(default)]
    pub output: String,

    #[serde(default = "default_true")]
    pub succeeded: bool,

    /// Failure message; `None` for successful calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ToolCallTrace {
    /// Trace for a call that produced output
    pub fn success(tool: ToolName, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool,
            input: input.into(),
            output: output.into(),
            succeeded: true,
            error: None,
        }
    }

    /// Trace for a call that failed
    pub fn failure(tool: ToolName, input: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool,
            input: input.into(),
            output: String::new(),
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// Terminal artifact of one orchestration run.
///
/// Every invocation produces exactly one of these, even when every
/// collaborator was unreachable; the fallbacks land in `result`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub agent_id: String,

    /// Task text as submitted
    pub task: String,

    /// Final user-facing answer
    pub result: String,

    /// Tool invocations in execution order
    #[serde(default)]
    pub tool_traces: Vec<ToolCallTrace>,

    /// Unprocessed composer output, when a completion produced one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_agent() -> AgentDefinition {
        AgentDefinition {
            agent_id: "a-1".into(),
            name: "Math Helper".into(),
            description: "Evaluates arithmetic".into(),
            prompt: "You are a math helper.".into(),
            tools: vec![ToolConfig::new(ToolName::Calculator, "arithmetic")],
            created_at: Utc::now(),
            is_composite: false,
            sub_agents: Vec::new(),
        }
    }

    #[test]
    fn test_summary_projection() {
        let agent = sample_agent();
        let summary = AgentSummary::from(&agent);
        assert_eq!(summary.agent_id, agent.agent_id);
        assert_eq!(summary.tools, vec![ToolName::Calculator]);
        assert!(!summary.is_composite);
    }

    #[test]
    fn test_trace_constructors() {
        let ok = ToolCallTrace::success(ToolName::Calculator, "1+1", "2.0");
        assert!(ok.succeeded);
        assert!(ok.error.is_none());

        let failed = ToolCallTrace::failure(ToolName::WebSearch, "rust news", "timeout");
        assert!(!failed.succeeded);
        assert_eq!(failed.output, "");
        assert_eq!(failed.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_agent_round_trips_through_json() {
        let agent = sample_agent();
        let encoded = serde_json::to_string(&agent).unwrap();
        let decoded: AgentDefinition = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, agent);
    }

    #[test]
    fn test_sub_agent_id_survives_round_trip() {
        let entry: SubAgentSummary = serde_json::from_value(json!({
            "agent_id": "abc-123",
            "name": "News Finder",
            "description": "Searches recent coverage",
            "tools": ["web_search"]
        }))
        .unwrap();
        assert_eq!(entry.agent_id.as_deref(), Some("abc-123"));

        let encoded = serde_json::to_value(&entry).unwrap();
        assert_eq!(encoded["agent_id"], json!("abc-123"));

        // member entries stored without an id stay id-less
        let entry: SubAgentSummary = serde_json::from_value(json!({"name": "Helper"})).unwrap();
        assert_eq!(entry.agent_id, None);
        let encoded = serde_json::to_value(&entry).unwrap();
        assert!(encoded.get("agent_id").is_none());
    }

    #[test]
    fn test_tool_name_wire_format() {
        let encoded = serde_json::to_string(&ToolName::WebSearch).unwrap();
        assert_eq!(encoded, "\"web_search\"");
        let decoded: ToolName = serde_json::from_str("\"amap_weather\"").unwrap();
        assert_eq!(decoded, ToolName::AmapWeather);
    }
}
