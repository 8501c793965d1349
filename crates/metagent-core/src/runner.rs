//! Task Runner
//!
//! Runs one task end to end: plan, execute the planned tool calls,
//! compose the final answer. The whole pipeline is infallible from the
//! caller's point of view; the worst case is a deterministic fallback
//! message in the result, never an error.

use std::sync::Arc;

use chrono::Utc;

use crate::backends::ToolBackends;
use crate::completion::{ChatTurn, CompletionClient};
use crate::composite;
use crate::model::{AgentDefinition, TaskResult, ToolCallTrace};
use crate::planner::{plan_tool_usage, PlannedCall};
use crate::tools::ToolBox;

const NO_BACKEND_MESSAGE: &str =
    "No completion backend is configured. Provide an API key to enable natural-language answers.";
const COMPOSE_FAILED_MESSAGE: &str =
    "The completion call failed and no tool results are available.";

/// Orchestrates task execution for any agent definition.
///
/// Holds no per-task state: a fresh [`ToolBox`] is built for every run,
/// so one runner serves concurrent tasks for different agents.
pub struct TaskRunner {
    completion: Option<Arc<dyn CompletionClient>>,
    backends: ToolBackends,
}

impl TaskRunner {
    pub fn new(completion: Option<Arc<dyn CompletionClient>>, backends: ToolBackends) -> Self {
        Self {
            completion,
            backends,
        }
    }

    fn completion(&self) -> Option<&dyn CompletionClient> {
        self.completion.as_deref()
    }

    /// Execute one task and return its terminal result
    pub async fn run(&self, agent: &AgentDefinition, task: &str) -> TaskResult {
        if agent.is_composite {
            return self.run_composite(agent, task).await;
        }

        let tool_box = ToolBox::new(&agent.tools, &self.backends);
        let available = tool_box.available_tool_names();
        let plan = plan_tool_usage(self.completion(), agent, task, &available).await;
        tracing::debug!(
            agent_id = %agent.agent_id,
            planned_calls = plan.len(),
            "executing task plan"
        );

        let (traces, notes) = execute_plan(&tool_box, &plan).await;
        let (result, raw_response) = self.compose_final_response(agent, task, &notes).await;

        TaskResult {
            agent_id: agent.agent_id.clone(),
            task: task.to_string(),
            result,
            tool_traces: traces,
            raw_response,
            created_at: Utc::now(),
        }
    }

    async fn run_composite(&self, agent: &AgentDefinition, task: &str) -> TaskResult {
        let (result, traces) =
            composite::run(self.completion(), &self.backends, agent, task).await;
        TaskResult {
            agent_id: agent.agent_id.clone(),
            task: task.to_string(),
            raw_response: Some(result.clone()),
            result,
            tool_traces: traces,
            created_at: Utc::now(),
        }
    }

    /// Compose the user-facing answer from the agent persona, the task,
    /// and the execution notes.
    ///
    /// Fallback ladder: no backend -> joined notes (or the fixed
    /// no-backend message); failed or empty completion -> joined notes
    /// (or the fixed failure message). `raw_response` is only set when
    /// a completion actually produced the answer.
    async fn compose_final_response(
        &self,
        agent: &AgentDefinition,
        task: &str,
        notes: &[String],
    ) -> (String, Option<String>) {
        let Some(client) = self.completion() else {
            if notes.is_empty() {
                return (NO_BACKEND_MESSAGE.to_string(), None);
            }
            return (notes.join("\n"), None);
        };

        let notes_section = if notes.is_empty() {
            "no additional context".to_string()
        } else {
            notes.join("\n")
        };
        let user = format!(
            "Task: {task}\nTool execution notes: {notes_section}\n\
             Provide the final answer based on the task and the tool results."
        );

        match client.complete(&agent.prompt, &[ChatTurn::user(user)], 0.4).await {
            Ok(content) if !content.trim().is_empty() => {
                let raw = content.clone();
                (content, Some(raw))
            }
            Ok(_) => {
                tracing::error!("empty content while composing the final response");
                (fallback_answer(notes), None)
            }
            Err(error) => {
                tracing::error!(%error, "failed to compose the final response");
                (fallback_answer(notes), None)
            }
        }
    }
}

fn fallback_answer(notes: &[String]) -> String {
    if notes.is_empty() {
        COMPOSE_FAILED_MESSAGE.to_string()
    } else {
        notes.join("\n")
    }
}

/// Run the planned calls in order against the tool box.
///
/// Returns the traces plus one human-readable note per call. A failed
/// call is recorded and execution continues with the next one.
async fn execute_plan(
    tool_box: &ToolBox,
    plan: &[PlannedCall],
) -> (Vec<ToolCallTrace>, Vec<String>) {
    let mut traces = Vec::with_capacity(plan.len());
    let mut notes = Vec::with_capacity(plan.len());

    for call in plan {
        match tool_box.run(call.tool, &call.query).await {
            Ok(output) => {
                let prefix = if call.reason.is_empty() {
                    format!("{} result", call.tool)
                } else {
                    call.reason.clone()
                };
                notes.push(format!("{prefix}: {output}"));
                traces.push(ToolCallTrace::success(call.tool, call.query.clone(), output));
            }
            Err(error) => {
                tracing::warn!(tool = %call.tool, %error, "tool call failed");
                let prefix = if call.reason.is_empty() {
                    format!("{} error", call.tool)
                } else {
                    call.reason.clone()
                };
                notes.push(format!("{prefix}: {error}"));
                traces.push(ToolCallTrace::failure(
                    call.tool,
                    call.query.clone(),
                    error.to_string(),
                ));
            }
        }
    }

    (traces, notes)
}
