//! Composite Orchestration
//!
//! Multi-step flow for composite agents: ask the completion backend for
//! a short step plan, run each step (a tool call or a generation), then
//! assemble one coherent answer from the step transcript. Every input
//! reaches a terminal state, including an absent backend and a plan the
//! model refuses to format properly.

use serde::Deserialize;
use serde_json::Value;

use crate::backends::ToolBackends;
use crate::completion::{parse_json_with_recovery, ChatTurn, CompletionClient};
use crate::model::{AgentDefinition, ToolCallTrace};
use crate::tools::{ToolBox, ToolName};

const NO_BACKEND_PREFIX: &str = "[Composite execution requires a completion backend]";
const EMPTY_TRANSCRIPT: &str = "(no step results)";
const SKIPPED_STEP_NOTE: &str = "(step skipped: no valid tool specified)";

/// Step plan requested from the model
#[derive(Debug, Deserialize)]
struct StepPlan {
    #[serde(default)]
    steps: Vec<PlannedStep>,
}

#[derive(Debug, Deserialize)]
struct PlannedStep {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    action: Option<String>,
    /// Kept raw: models sometimes nest structures where a string was
    /// asked for, and a nested input should not sink the whole plan
    #[serde(default)]
    input: Value,
    #[serde(default)]
    tool: Option<String>,
}

impl PlannedStep {
    fn input_text(&self) -> String {
        match &self.input {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Run the composite flow, returning the final answer and the traces of
/// every tool step.
///
/// Without a backend the result is a fixed notice carrying the task
/// text, with no traces: the flow cannot plan, so nothing executes.
pub(crate) async fn run(
    completion: Option<&dyn CompletionClient>,
    backends: &ToolBackends,
    agent: &AgentDefinition,
    task: &str,
) -> (String, Vec<ToolCallTrace>) {
    let mut traces = Vec::new();

    let Some(client) = completion else {
        return (format!("{NO_BACKEND_PREFIX}\n{task}"), traces);
    };

    let steps = plan_steps(client, agent, task).await;
    let tool_box = ToolBox::new(&agent.tools, backends);

    let mut sections: Vec<String> = Vec::new();
    for step in &steps {
        let title = step.title.clone().unwrap_or_else(|| "Step".to_string());
        let action = step.action.as_deref().unwrap_or_default().to_lowercase();
        let input = step.input_text();

        if action == "use_tool" {
            // tool-name validity and membership are both enforced by
            // the tool box; an unknown name never produces a trace
            let Some(tool) = step.tool.as_deref().and_then(ToolName::parse) else {
                sections.push(format!("## {title}\n\n{SKIPPED_STEP_NOTE}"));
                continue;
            };
            match tool_box.run(tool, &input).await {
                Ok(output) => {
                    traces.push(ToolCallTrace::success(tool, input.clone(), output.clone()));
                    sections.push(format!("## {title}\n\n{output}"));
                }
                Err(error) => {
                    tracing::warn!(%tool, %error, "composite tool step failed");
                    traces.push(ToolCallTrace::failure(tool, input.clone(), error.to_string()));
                    sections.push(format!("## {title}\n\n(tool execution failed) {error}"));
                }
            }
        } else {
            let prompt = format!("Step: {title}\nGuidance: {input}");
            match client.complete(&agent.prompt, &[ChatTurn::user(prompt)], 0.2).await {
                Ok(content) => sections.push(format!("## {title}\n\n{content}")),
                Err(error) => {
                    tracing::warn!(%error, "composite generation step failed");
                    sections.push(format!("## {title}\n\n(generation failed) {error}"));
                }
            }
        }
    }

    let transcript = if sections.is_empty() {
        EMPTY_TRANSCRIPT.to_string()
    } else {
        sections.join("\n\n")
    };

    let assembly = format!(
        "Overall goal: {task}\nStep results:\n{transcript}\n\
         Combine these into the final answer, formatted as Markdown."
    );
    match client
        .complete(&agent.prompt, &[ChatTurn::user(assembly)], 0.2)
        .await
    {
        Ok(content) if !content.trim().is_empty() => (content, traces),
        Ok(_) => {
            tracing::warn!("empty assembly response; returning the raw step transcript");
            (transcript, traces)
        }
        Err(error) => {
            tracing::warn!(%error, "assembly failed; returning the raw step transcript");
            (transcript, traces)
        }
    }
}

/// Ask the model for the step plan. Any failure, or a payload the
/// two-stage JSON recovery cannot read, yields an empty plan; the flow
/// still assembles a result from the empty transcript.
async fn plan_steps(
    client: &dyn CompletionClient,
    agent: &AgentDefinition,
    task: &str,
) -> Vec<PlannedStep> {
    let available = if agent.tools.is_empty() {
        "(no tools; generation-only steps)".to_string()
    } else {
        agent
            .tools
            .iter()
            .map(|config| format!("- {}: {}", config.name, config.description))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let system = "You are an orchestration planner. Given a user goal and the available tools, \
                  produce a minimal step plan as strict JSON. Each step has fields `title`, \
                  `action`, `input`, and optionally `tool`. `action` is one of 'use_tool' or \
                  'llm_generate'. Prefer 'use_tool' whenever a suitable tool exists.";
    let user = format!(
        "Goal: {task}\nAvailable tools:\n{available}\n\
         Return JSON with a single field `steps`: a list of step objects, nothing else."
    );

    let content = match client.complete(system, &[ChatTurn::user(user)], 0.0).await {
        Ok(content) => content,
        Err(error) => {
            tracing::warn!(%error, "composite step planning failed");
            return Vec::new();
        }
    };
    tracing::debug!(raw = %content, "composite step plan");

    match parse_json_with_recovery::<StepPlan>(&content) {
        Some(plan) => plan.steps,
        None => {
            tracing::warn!("unparseable composite step plan");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{MockSearchBackend, MockWeatherBackend, SearchHit};
    use crate::completion::ScriptedCompletion;
    use crate::model::ToolConfig;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;

    fn backends() -> ToolBackends {
        ToolBackends {
            search: Arc::new(MockSearchBackend::with_hits(vec![SearchHit::new(
                "title", "snippet", "link",
            )])),
            weather: Arc::new(MockWeatherBackend::new()),
        }
    }

    fn composite_agent(tools: Vec<ToolConfig>) -> AgentDefinition {
        AgentDefinition {
            agent_id: "composite-1".into(),
            name: "Composite Agent".into(),
            description: "multi-step".into(),
            prompt: "You orchestrate steps.".into(),
            tools,
            created_at: Utc::now(),
            is_composite: true,
            sub_agents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_no_backend_fixed_notice_and_no_traces() {
        let agent = composite_agent(vec![ToolConfig::new(ToolName::Calculator, "math")]);
        let (result, traces) = run(None, &backends(), &agent, "research and summarize").await;

        assert_eq!(
            result,
            "[Composite execution requires a completion backend]\nresearch and summarize"
        );
        assert!(traces.is_empty());
    }

    #[tokio::test]
    async fn test_tool_and_generation_steps_assembled() {
        let plan = json!({"steps": [
            {"title": "Compute", "action": "use_tool", "input": "3 * 4", "tool": "calculator"},
            {"title": "Explain", "action": "llm_generate", "input": "explain the result"},
        ]});
        let client = ScriptedCompletion::new()
            .reply(plan.to_string())
            .reply("Twelve is the product.")
            .reply("# Final\nEverything checks out.");
        let agent = composite_agent(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let (result, traces) = run(Some(&client), &backends(), &agent, "compute and explain").await;

        assert_eq!(result, "# Final\nEverything checks out.");
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].output, "12.0");

        // the assembly prompt carried both step sections
        let assembly_call = client.call(2).unwrap();
        assert!(assembly_call.turns[0].content.contains("## Compute"));
        assert!(assembly_call.turns[0].content.contains("12.0"));
        assert!(assembly_call.turns[0].content.contains("## Explain"));
        assert!(assembly_call.turns[0]
            .content
            .contains("Twelve is the product."));
    }

    #[tokio::test]
    async fn test_unknown_tool_step_skipped_without_trace() {
        let plan = json!({"steps": [
            {"title": "Run code", "action": "use_tool", "input": "print(1)", "tool": "python"},
        ]});
        let client = ScriptedCompletion::new()
            .reply(plan.to_string())
            .reply("assembled");
        let agent = composite_agent(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let (result, traces) = run(Some(&client), &backends(), &agent, "task").await;

        assert_eq!(result, "assembled");
        assert!(traces.is_empty());

        let assembly_call = client.call(1).unwrap();
        assert!(assembly_call.turns[0].content.contains(SKIPPED_STEP_NOTE));
    }

    #[tokio::test]
    async fn test_unconfigured_tool_step_leaves_failed_trace() {
        let plan = json!({"steps": [
            {"title": "Look up", "action": "use_tool", "input": "rust", "tool": "web_search"},
        ]});
        let client = ScriptedCompletion::new()
            .reply(plan.to_string())
            .reply("assembled");
        // agent knows the name but was never granted the tool
        let agent = composite_agent(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let (_, traces) = run(Some(&client), &backends(), &agent, "task").await;

        assert_eq!(traces.len(), 1);
        assert!(!traces[0].succeeded);
        assert!(traces[0]
            .error
            .as_deref()
            .unwrap()
            .contains("is not available for this agent"));
    }

    #[tokio::test]
    async fn test_fenced_plan_recovered() {
        let plan = "```json\n{\"steps\": [{\"title\": \"Check weather\", \"action\": \
                    \"use_tool\", \"input\": \"Shanghai\", \"tool\": \"amap_weather\"}]}\n```";
        let client = ScriptedCompletion::new().reply(plan).reply("assembled");
        let agent = composite_agent(vec![ToolConfig::new(ToolName::AmapWeather, "weather")]);

        let (_, traces) = run(Some(&client), &backends(), &agent, "weather check").await;

        // mock backend has no city, so the step fails, but the plan
        // itself was recovered and executed
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].tool, ToolName::AmapWeather);
    }

    #[tokio::test]
    async fn test_unparseable_plan_assembles_empty_transcript() {
        let client = ScriptedCompletion::new()
            .reply("I would rather describe the steps in prose.")
            .reply("assembled from nothing");
        let agent = composite_agent(Vec::new());

        let (result, traces) = run(Some(&client), &backends(), &agent, "task").await;

        assert_eq!(result, "assembled from nothing");
        assert!(traces.is_empty());

        let assembly_call = client.call(1).unwrap();
        assert!(assembly_call.turns[0].content.contains(EMPTY_TRANSCRIPT));
    }

    #[tokio::test]
    async fn test_generation_failure_noted_and_flow_continues() {
        let plan = json!({"steps": [
            {"title": "Draft", "action": "llm_generate", "input": "write a draft"},
            {"title": "Compute", "action": "use_tool", "input": "1 + 1", "tool": "calculator"},
        ]});
        let client = ScriptedCompletion::new()
            .reply(plan.to_string())
            .fail("model overloaded")
            .reply("assembled anyway");
        let agent = composite_agent(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let (result, traces) = run(Some(&client), &backends(), &agent, "task").await;

        assert_eq!(result, "assembled anyway");
        assert_eq!(traces.len(), 1);
        assert!(traces[0].succeeded);

        let assembly_call = client.call(2).unwrap();
        assert!(assembly_call.turns[0]
            .content
            .contains("(generation failed) Completion error: model overloaded"));
    }

    #[tokio::test]
    async fn test_assembly_failure_returns_transcript() {
        let plan = json!({"steps": [
            {"title": "Compute", "action": "use_tool", "input": "5 * 5", "tool": "calculator"},
        ]});
        let client = ScriptedCompletion::new().reply(plan.to_string()).fail("boom");
        let agent = composite_agent(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let (result, traces) = run(Some(&client), &backends(), &agent, "task").await;

        assert_eq!(result, "## Compute\n\n25.0");
        assert_eq!(traces.len(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_action_defaults_to_generation() {
        let plan = json!({"steps": [
            {"title": "Mystery", "action": "browse", "input": "whatever"},
        ]});
        let client = ScriptedCompletion::new()
            .reply(plan.to_string())
            .reply("generated text")
            .reply("assembled");
        let agent = composite_agent(Vec::new());

        let (result, traces) = run(Some(&client), &backends(), &agent, "task").await;

        assert_eq!(result, "assembled");
        assert!(traces.is_empty());

        // the generation call used the step guidance
        let generation_call = client.call(1).unwrap();
        assert!(generation_call.turns[0].content.contains("Guidance: whatever"));
        assert!((generation_call.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_nested_input_stringified_not_fatal() {
        let plan = json!({"steps": [
            {"title": "Compute", "action": "use_tool", "input": {"expr": "1+1"}, "tool": "calculator"},
        ]});
        let client = ScriptedCompletion::new()
            .reply(plan.to_string())
            .reply("assembled");
        let agent = composite_agent(vec![ToolConfig::new(ToolName::Calculator, "math")]);

        let (_, traces) = run(Some(&client), &backends(), &agent, "task").await;

        // the stringified object is not valid arithmetic, so the call
        // fails, but the plan survived parsing
        assert_eq!(traces.len(), 1);
        assert!(!traces[0].succeeded);
    }
}
