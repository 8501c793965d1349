//! Task Planner
//!
//! Decides which tool invocations a task needs. The completion backend
//! gets the first word; whenever it is missing, declines to answer, or
//! returns something unusable, a deterministic heuristic produces the
//! plan instead, so planning works identically with no backend at all.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::completion::{ChatTurn, CompletionClient};
use crate::model::AgentDefinition;
use crate::tools::{coerce_bool, ToolName};

/// One intended tool invocation, in execution order.
///
/// Ephemeral: planned calls exist between planning and execution and
/// are never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedCall {
    pub tool: ToolName,
    pub query: String,
    /// Planner's stated motivation; used as the note prefix downstream
    pub reason: String,
}

/// Payload shape requested from the planning model
#[derive(Debug, Deserialize)]
struct PlanPayload {
    #[serde(default = "default_true")]
    should_use_tools: bool,
    #[serde(default)]
    tool_calls: Vec<RawPlannedCall>,
}

#[derive(Debug, Deserialize)]
struct RawPlannedCall {
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Produce the tool plan for one task.
///
/// With no configured tools the plan is empty and no external call is
/// made. Suggestions referencing unknown or unconfigured tools are
/// dropped; a model failure of any kind falls back to the heuristic.
pub(crate) async fn plan_tool_usage(
    completion: Option<&dyn CompletionClient>,
    agent: &AgentDefinition,
    task: &str,
    available: &[ToolName],
) -> Vec<PlannedCall> {
    if available.is_empty() {
        return Vec::new();
    }
    let Some(client) = completion else {
        return heuristic_plan(task, available);
    };
    let calls = model_plan(client, agent, task, available).await;
    if calls.is_empty() {
        heuristic_plan(task, available)
    } else {
        calls
    }
}

async fn model_plan(
    client: &dyn CompletionClient,
    agent: &AgentDefinition,
    task: &str,
    available: &[ToolName],
) -> Vec<PlannedCall> {
    let mut system = String::from(
        "You are a planning assistant. Decide how the agent should solve the user's request. \
         Available tools:\n",
    );
    for tool in available {
        system.push_str(&format!("- {tool}: {}\n", tool.capability()));
    }
    system.push_str(
        "Respond with JSON containing `should_use_tools` (boolean) and `tool_calls` (list of \
         objects with fields `tool`, `query`, `reason`). Use the fewest necessary tool calls. \
         If tools are unnecessary, return `should_use_tools: false` and an empty list.",
    );

    let (auto_search, strategy) = search_hints(agent);
    let user = format!(
        "Agent persona: {}\nTask: {}\nAuto search enabled: {}\nSearch strategy hint: {}",
        agent.name,
        task,
        auto_search,
        strategy.as_deref().unwrap_or("default"),
    );

    let content = match client.complete(&system, &[ChatTurn::user(user)], 0.0).await {
        Ok(content) if !content.trim().is_empty() => content,
        Ok(_) => {
            tracing::warn!("planning model returned empty content; using heuristic plan");
            return Vec::new();
        }
        Err(error) => {
            tracing::warn!(%error, "tool planning via completion backend failed; using heuristic plan");
            return Vec::new();
        }
    };

    let Ok(payload) = serde_json::from_str::<PlanPayload>(&content) else {
        tracing::warn!("unparseable planning payload; using heuristic plan");
        return Vec::new();
    };
    if !payload.should_use_tools {
        return Vec::new();
    }

    payload
        .tool_calls
        .into_iter()
        .filter_map(|raw| {
            let tool = ToolName::parse(raw.tool.as_deref().unwrap_or_default())?;
            if !available.contains(&tool) {
                return None;
            }
            let query = raw.query.unwrap_or_default();
            let query = query.trim();
            if query.is_empty() {
                return None;
            }
            Some(PlannedCall {
                tool,
                query: query.to_string(),
                reason: raw.reason.unwrap_or_default(),
            })
        })
        .collect()
}

/// Planner hints carried on the agent's web search configuration.
/// With duplicate configurations the last one wins.
fn search_hints(agent: &AgentDefinition) -> (bool, Option<String>) {
    let params = agent
        .tools
        .iter()
        .rev()
        .find(|config| config.name == ToolName::WebSearch)
        .map(|config| &config.parameters);

    let auto_search = params
        .and_then(|p| p.get("auto_search"))
        .is_some_and(coerce_bool);
    let strategy = params
        .and_then(|p| p.get("strategy"))
        .and_then(serde_json::Value::as_str)
        .filter(|hint| !hint.is_empty())
        .map(str::to_string);

    (auto_search, strategy)
}

/// Deterministic fallback plan.
///
/// Same task and tool set always yield the same calls: a web search on
/// the whole task when search is configured, plus a calculator call
/// when an arithmetic expression can be extracted.
pub fn heuristic_plan(task: &str, available: &[ToolName]) -> Vec<PlannedCall> {
    let mut plan = Vec::new();

    if available.contains(&ToolName::WebSearch) {
        let keyword = task.trim();
        if !keyword.is_empty() {
            plan.push(PlannedCall {
                tool: ToolName::WebSearch,
                query: keyword.to_string(),
                reason: "Search for up-to-date information related to the task".to_string(),
            });
        }
    }

    if available.contains(&ToolName::Calculator) {
        if let Some(expression) = extract_expression(task) {
            plan.push(PlannedCall {
                tool: ToolName::Calculator,
                query: expression,
                reason: "Evaluate the arithmetic expression in the task".to_string(),
            });
        }
    }

    plan
}

static VERB_EXPRESSION: OnceLock<Regex> = OnceLock::new();
static BARE_EXPRESSION: OnceLock<Regex> = OnceLock::new();

/// Pull an arithmetic substring out of a task: either introduced by a
/// calculation verb (English or Chinese) or the entire task being one
/// expression.
fn extract_expression(task: &str) -> Option<String> {
    let verb = VERB_EXPRESSION.get_or_init(|| {
        Regex::new(r"(?i)(?:calc(?:ulate)?|计算|算|求)[^\d()+\-*/]*([\d\s+\-*/.()]+)")
            .expect("verb expression pattern is valid")
    });
    if let Some(captures) = verb.captures(task) {
        let expression = captures[1].trim();
        if !expression.is_empty() {
            return Some(expression.to_string());
        }
    }

    let bare = BARE_EXPRESSION.get_or_init(|| {
        Regex::new(r"^[\d\s+\-*/.()]+$").expect("bare expression pattern is valid")
    });
    let trimmed = task.trim();
    if !trimmed.is_empty() && bare.is_match(trimmed) {
        return Some(trimmed.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;
    use crate::model::ToolConfig;
    use chrono::Utc;
    use serde_json::json;

    fn agent_with(tools: Vec<ToolConfig>) -> AgentDefinition {
        AgentDefinition {
            agent_id: "a-1".into(),
            name: "Research Agent".into(),
            description: "test agent".into(),
            prompt: "You are a research agent.".into(),
            tools,
            created_at: Utc::now(),
            is_composite: false,
            sub_agents: Vec::new(),
        }
    }

    #[test]
    fn test_expression_extraction() {
        assert_eq!(
            extract_expression("Please calculate 12 * (3 + 4) for me"),
            Some("12 * (3 + 4)".to_string())
        );
        assert_eq!(extract_expression("算 1+2"), Some("1+2".to_string()));
        assert_eq!(extract_expression("  3 * 14 "), Some("3 * 14".to_string()));
        assert_eq!(extract_expression("what is the capital of France"), None);
        assert_eq!(extract_expression("calculate the odds"), None);
    }

    #[test]
    fn test_heuristic_is_deterministic() {
        let available = [ToolName::WebSearch, ToolName::Calculator];
        let task = "calculate 2 + 2 and check the latest news";
        let first = heuristic_plan(task, &available);
        let second = heuristic_plan(task, &available);
        assert_eq!(first, second);

        assert_eq!(first.len(), 2);
        assert_eq!(first[0].tool, ToolName::WebSearch);
        assert_eq!(first[0].query, task);
        assert_eq!(first[1].tool, ToolName::Calculator);
        assert_eq!(first[1].query, "2 + 2");
    }

    #[test]
    fn test_heuristic_skips_unconfigured_tools() {
        let plan = heuristic_plan("calculate 1 + 1", &[ToolName::AmapWeather]);
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_no_tools_means_no_plan_and_no_call() {
        let client = ScriptedCompletion::new().reply("should never be consumed");
        let agent = agent_with(Vec::new());

        let plan = plan_tool_usage(Some(&client), &agent, "any task", &[]).await;
        assert!(plan.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_plan_filters_unknown_and_unconfigured() {
        let reply = json!({
            "should_use_tools": true,
            "tool_calls": [
                {"tool": "calculator", "query": "1 + 1", "reason": "math"},
                {"tool": "python", "query": "print(1)", "reason": "unknown tool"},
                {"tool": "amap_weather", "query": "Shanghai", "reason": "not configured"},
                {"tool": "calculator", "query": "   ", "reason": "blank query"},
            ]
        });
        let client = ScriptedCompletion::new().reply(reply.to_string());
        let agent = agent_with(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let plan =
            plan_tool_usage(Some(&client), &agent, "some task", &[ToolName::Calculator]).await;
        assert_eq!(
            plan,
            vec![PlannedCall {
                tool: ToolName::Calculator,
                query: "1 + 1".to_string(),
                reason: "math".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_model_decline_falls_back_to_heuristic() {
        let reply = json!({"should_use_tools": false, "tool_calls": []});
        let client = ScriptedCompletion::new().reply(reply.to_string());
        let agent = agent_with(vec![ToolConfig::new(ToolName::WebSearch, "search")]);

        let plan =
            plan_tool_usage(Some(&client), &agent, "latest rust news", &[ToolName::WebSearch])
                .await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].tool, ToolName::WebSearch);
        assert_eq!(plan[0].query, "latest rust news");
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_to_heuristic() {
        let client = ScriptedCompletion::new().fail("connection refused");
        let agent = agent_with(vec![ToolConfig::new(ToolName::WebSearch, "search")]);

        let plan = plan_tool_usage(Some(&client), &agent, "查询天气", &[ToolName::WebSearch]).await;
        assert_eq!(plan.len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_payload_falls_back_to_heuristic() {
        let client = ScriptedCompletion::new().reply("I think you should use the calculator.");
        let agent = agent_with(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let plan =
            plan_tool_usage(Some(&client), &agent, "calculate 5 * 5", &[ToolName::Calculator])
                .await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].query, "5 * 5");
    }

    #[tokio::test]
    async fn test_planner_prompt_carries_search_hints() {
        let reply = json!({"should_use_tools": true, "tool_calls": [
            {"tool": "web_search", "query": "rust 1.80", "reason": "lookup"}
        ]});
        let client = ScriptedCompletion::new().reply(reply.to_string());
        let config = ToolConfig::new(ToolName::WebSearch, "search")
            .with_parameter("auto_search", json!(true))
            .with_parameter("strategy", json!("prefer official sources"));
        let agent = agent_with(vec![config]);

        plan_tool_usage(Some(&client), &agent, "rust 1.80", &[ToolName::WebSearch]).await;

        let call = client.call(0).unwrap();
        assert!((call.temperature - 0.0).abs() < f32::EPSILON);
        assert!(call.system.contains("planning assistant"));
        assert!(call.turns[0].content.contains("Auto search enabled: true"));
        assert!(call.turns[0]
            .content
            .contains("Search strategy hint: prefer official sources"));
    }

    #[tokio::test]
    async fn test_no_client_uses_heuristic_directly() {
        let agent = agent_with(vec![ToolConfig::new(ToolName::Calculator, "math")]);
        let plan = plan_tool_usage(None, &agent, "求 9 * 9", &[ToolName::Calculator]).await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].query, "9 * 9");
    }
}
