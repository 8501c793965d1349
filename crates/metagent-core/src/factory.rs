//! Agent Factory
//!
//! Synthesizes agent definitions from natural-language requirements.
//! The completion backend picks tools from the fixed catalog and writes
//! the metadata; deterministic fallbacks cover a missing backend and
//! every failure mode, so synthesis always yields a usable agent.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::completion::{parse_json_with_recovery, ChatTurn, CompletionClient};
use crate::model::{AgentDefinition, ToolConfig};
use crate::tools::{normalize_parameters, ToolName};

const FALLBACK_AGENT_NAME: &str = "Custom Agent";

/// Longest requirement reused verbatim as the fallback agent name
const FRIENDLY_NAME_MAX_CHARS: usize = 40;

/// Agent synthesis over an optional completion backend
pub struct AgentFactory {
    completion: Option<Arc<dyn CompletionClient>>,
}

#[derive(Debug, Deserialize)]
struct ToolSelectionPayload {
    #[serde(default)]
    tools: Vec<SelectedTool>,
}

#[derive(Debug, Deserialize)]
struct SelectedTool {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
}

/// Metadata payload requested from the model. All three fields are
/// required; anything less falls back.
#[derive(Debug, Deserialize)]
struct AgentMetadata {
    name: String,
    description: String,
    prompt: String,
}

impl AgentFactory {
    pub fn new(completion: Option<Arc<dyn CompletionClient>>) -> Self {
        Self { completion }
    }

    fn completion(&self) -> Option<&dyn CompletionClient> {
        self.completion.as_deref()
    }

    /// Synthesize a complete agent definition from a requirement.
    ///
    /// Infallible: without a usable backend the agent carries no tools
    /// and deterministic fallback metadata.
    pub async fn create_agent(&self, user_requirement: &str, is_composite: bool) -> AgentDefinition {
        let tools = self.select_tools(user_requirement).await;
        let metadata = self.build_metadata(user_requirement, &tools).await;

        AgentDefinition {
            agent_id: Uuid::new_v4().to_string(),
            name: metadata.name,
            description: metadata.description,
            prompt: metadata.prompt,
            tools,
            created_at: Utc::now(),
            is_composite,
            sub_agents: Vec::new(),
        }
    }

    /// Pick tools from the closed catalog via the model. Selection is
    /// few-shot prompted; unknown names are dropped and parameters are
    /// normalized before they ever reach a definition.
    async fn select_tools(&self, user_requirement: &str) -> Vec<ToolConfig> {
        let Some(client) = self.completion() else {
            return Vec::new();
        };

        let catalog = ToolName::catalog().to_string();
        let system = "You are an expert AI system architect. Given a user requirement and a \
                      list of available tools, select the minimal set of tools the agent needs.\n\
                      Guidelines:\n\
                      - Arithmetic or numeric evaluation: choose calculator.\n\
                      - Weather questions, live or forecast, by city: choose amap_weather \
                      (parameters: mode = 'live' or 'forecast').\n\
                      - News, search, or research questions: choose web_search.\n\
                      - Only choose web_search when fresh web information is required or \
                      clearly implied.\n\
                      Return strict JSON with one field `tools`: a list of objects \
                      {name, description, parameters?}. Return an empty list when no tool fits.";

        let output_hint = "\nOutput strict JSON with only the `tools` field.";
        let weather_example = json!({
            "tools": [{
                "name": "amap_weather",
                "description": "Live and forecast weather lookups by city",
                "parameters": {"mode": "forecast"}
            }]
        });
        let news_example = json!({
            "tools": [{
                "name": "web_search",
                "description": "Search for fresh news and headlines",
                "parameters": {"auto_search": true}
            }]
        });

        let turns = vec![
            ChatTurn::user(format!(
                "User requirement: Create a weather assistant that reports current conditions \
                 and the coming days\nAvailable tools: {catalog}{output_hint}"
            )),
            ChatTurn::assistant(weather_example.to_string()),
            ChatTurn::user(format!(
                "User requirement: Create a news agent focused on the latest headlines\n\
                 Available tools: {catalog}{output_hint}"
            )),
            ChatTurn::assistant(news_example.to_string()),
            ChatTurn::user(format!(
                "User requirement: {user_requirement}\nAvailable tools: {catalog}{output_hint}"
            )),
        ];

        let content = match client.complete(system, &turns, 0.0).await {
            Ok(content) if !content.trim().is_empty() => content,
            Ok(_) => {
                tracing::warn!("empty tool selection response; creating a tool-less agent");
                return Vec::new();
            }
            Err(error) => {
                tracing::warn!(%error, "tool selection failed; creating a tool-less agent");
                return Vec::new();
            }
        };

        let payload = match serde_json::from_str::<ToolSelectionPayload>(&content) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(%error, "unparseable tool selection payload");
                return Vec::new();
            }
        };

        payload
            .tools
            .into_iter()
            .filter_map(|selected| {
                let tool = ToolName::parse(selected.name.as_deref().unwrap_or_default())?;
                let parameters = selected.parameters.unwrap_or_default();
                Some(ToolConfig {
                    name: tool,
                    description: selected.description.unwrap_or_default(),
                    parameters: normalize_parameters(tool, &parameters),
                })
            })
            .collect()
    }

    /// Write the agent's name, description, and system prompt via the
    /// model, with two-stage JSON recovery on the reply.
    async fn build_metadata(
        &self,
        user_requirement: &str,
        tools: &[ToolConfig],
    ) -> AgentMetadata {
        let Some(client) = self.completion() else {
            tracing::warn!("completion backend not configured; using fallback agent metadata");
            return fallback_metadata(user_requirement, tools);
        };

        let tools_summary = Value::Array(
            tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    })
                })
                .collect(),
        )
        .to_string();

        let system = "You are a senior AI system designer. Using the user requirement and the \
                      agent's tools, produce the agent's metadata.\n\
                      Output strict JSON with exactly these fields:\n\
                      - name: a concise agent name\n\
                      - description: one clear sentence covering capabilities and scope\n\
                      - prompt: the agent's system prompt, covering persona, workflow, and the \
                      available tools with usage principles\n\
                      Do not output anything beyond the JSON, and no code fences.";
        let user = format!(
            "User requirement: {user_requirement}\nAgent tools (JSON): {tools_summary}\n\
             Return only the requested JSON."
        );

        match client.complete(system, &[ChatTurn::user(user)], 0.2).await {
            Ok(content) if !content.trim().is_empty() => {
                match parse_json_with_recovery::<AgentMetadata>(&content) {
                    Some(metadata) => metadata,
                    None => {
                        tracing::error!("unparseable agent metadata; using fallback");
                        fallback_metadata(user_requirement, tools)
                    }
                }
            }
            Ok(_) => {
                tracing::error!("empty agent metadata response; using fallback");
                fallback_metadata(user_requirement, tools)
            }
            Err(error) => {
                tracing::error!(%error, "agent metadata generation failed; using fallback");
                fallback_metadata(user_requirement, tools)
            }
        }
    }
}

/// Deterministic metadata for when the model cannot provide any
fn fallback_metadata(user_requirement: &str, tools: &[ToolConfig]) -> AgentMetadata {
    let name = friendly_name(user_requirement);
    let description = compose_description(user_requirement, tools, &name);

    let joined = tools
        .iter()
        .map(|tool| tool.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let tool_clause = if joined.is_empty() {
        String::new()
    } else {
        format!("You may use these tools: {joined}. ")
    };

    AgentMetadata {
        name,
        description,
        prompt: format!(
            "You are a helpful assistant focused on the user's stated goal. {tool_clause}\
             When tools are insufficient or not provided, answer from your own knowledge \
             and say so."
        ),
    }
}

/// Short requirements become the agent name directly, minus leading
/// politeness; anything long or empty gets the generic name.
fn friendly_name(user_requirement: &str) -> String {
    let mut candidate = user_requirement.trim();
    for prefix in [
        "please", "Please", "help me", "Help me", "i need", "I need", "请", "帮我", "需要",
    ] {
        if let Some(rest) = candidate.strip_prefix(prefix) {
            candidate = rest.trim_start();
        }
    }
    if !candidate.is_empty() && candidate.chars().count() <= FRIENDLY_NAME_MAX_CHARS {
        candidate.to_string()
    } else {
        FALLBACK_AGENT_NAME.to_string()
    }
}

fn compose_description(user_requirement: &str, tools: &[ToolConfig], agent_name: &str) -> String {
    let requirement = user_requirement.trim();
    let requirement = if requirement.is_empty() {
        "the user's stated goal"
    } else {
        requirement
    };

    let mut names: Vec<&str> = tools.iter().map(|tool| tool.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    let tool_hint = if names.is_empty() {
        String::new()
    } else {
        format!(" (tools: {})", names.join(", "))
    };

    format!("{agent_name} handles the requested tasks{tool_hint}, intended for: {requirement}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;

    fn factory_with(client: ScriptedCompletion) -> (AgentFactory, Arc<ScriptedCompletion>) {
        let client = Arc::new(client);
        let factory = AgentFactory::new(Some(client.clone() as Arc<dyn CompletionClient>));
        (factory, client)
    }

    #[tokio::test]
    async fn test_no_backend_yields_toolless_agent_with_fallback_metadata() {
        let factory = AgentFactory::new(None);
        let agent = factory.create_agent("track crypto prices", false).await;

        assert!(agent.tools.is_empty());
        assert_eq!(agent.name, "track crypto prices");
        assert!(agent.description.contains("track crypto prices"));
        assert!(!agent.prompt.contains("You may use these tools"));
        assert!(!agent.agent_id.is_empty());
        assert!(!agent.is_composite);
    }

    #[tokio::test]
    async fn test_selection_and_metadata_flow() {
        let selection = json!({
            "tools": [
                {"name": "amap_weather", "description": "weather lookups",
                 "parameters": {"mode": "FORECAST", "junk": true}},
                {"name": "rocket_launcher", "description": "dropped"},
            ]
        });
        let metadata = json!({
            "name": "Weather Scout",
            "description": "Reports weather by city.",
            "prompt": "You are Weather Scout."
        });
        let (factory, client) = factory_with(
            ScriptedCompletion::new()
                .reply(selection.to_string())
                .reply(metadata.to_string()),
        );

        let agent = factory.create_agent("weather agent for trips", false).await;

        assert_eq!(agent.name, "Weather Scout");
        assert_eq!(agent.tools.len(), 1);
        assert_eq!(agent.tools[0].name, ToolName::AmapWeather);
        // parameters normalized at synthesis time
        assert_eq!(agent.tools[0].parameters["mode"], json!("forecast"));
        assert!(!agent.tools[0].parameters.contains_key("junk"));

        // selection at temperature 0, metadata at the creative floor
        assert!((client.call(0).unwrap().temperature - 0.0).abs() < f32::EPSILON);
        assert!((client.call(1).unwrap().temperature - 0.2).abs() < f32::EPSILON);
        // few-shot examples travel ahead of the real requirement
        assert_eq!(client.call(0).unwrap().turns.len(), 5);
    }

    #[tokio::test]
    async fn test_selection_failure_still_creates_agent() {
        let metadata = json!({
            "name": "Plain Agent",
            "description": "Answers questions.",
            "prompt": "You are helpful."
        });
        let (factory, _) = factory_with(
            ScriptedCompletion::new()
                .fail("selection backend down")
                .reply(metadata.to_string()),
        );

        let agent = factory.create_agent("a general helper", false).await;

        assert!(agent.tools.is_empty());
        assert_eq!(agent.name, "Plain Agent");
    }

    #[tokio::test]
    async fn test_fenced_metadata_recovered() {
        let selection = json!({"tools": []});
        let (factory, _) = factory_with(
            ScriptedCompletion::new()
                .reply(selection.to_string())
                .reply(
                    "```json\n{\"name\": \"N\", \"description\": \"D\", \"prompt\": \"P\"}\n```",
                ),
        );

        let agent = factory.create_agent("minimal agent", true).await;

        assert_eq!(agent.name, "N");
        assert!(agent.is_composite);
    }

    #[tokio::test]
    async fn test_incomplete_metadata_falls_back() {
        let selection = json!({"tools": [{"name": "calculator", "description": "math"}]});
        // missing `prompt`
        let metadata = json!({"name": "N", "description": "D"});
        let (factory, _) = factory_with(
            ScriptedCompletion::new()
                .reply(selection.to_string())
                .reply(metadata.to_string()),
        );

        let agent = factory.create_agent("math agent", false).await;

        assert_eq!(agent.tools.len(), 1);
        // fallback metadata mentions the selected tool
        assert!(agent.prompt.contains("calculator"));
        assert!(agent.description.contains("(tools: calculator)"));
    }

    #[test]
    fn test_friendly_name_rules() {
        assert_eq!(friendly_name("Please help me plan meals"), "plan meals");
        assert_eq!(friendly_name("请帮我查天气"), "查天气");
        assert_eq!(friendly_name("build a research agent"), "build a research agent");
        assert_eq!(friendly_name(""), FALLBACK_AGENT_NAME);
        let long = "x".repeat(80);
        assert_eq!(friendly_name(&long), FALLBACK_AGENT_NAME);
    }

    #[test]
    fn test_description_lists_sorted_unique_tools() {
        let tools = vec![
            ToolConfig::new(ToolName::WebSearch, "search"),
            ToolConfig::new(ToolName::Calculator, "math"),
            ToolConfig::new(ToolName::WebSearch, "search again"),
        ];
        let description = compose_description("do research", &tools, "Researcher");
        assert!(description.contains("(tools: calculator, web_search)"));
        assert!(description.ends_with("intended for: do research."));
    }
}
