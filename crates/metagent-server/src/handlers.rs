//! HTTP Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use metagent_core::{AgentDefinition, AgentSummary, TaskResult};

use crate::state::AppState;

/// Minimum length, in characters, for a requirement or task.
const MIN_TEXT_LEN: usize = 3;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AgentCreateRequest {
    pub user_requirement: String,
    #[serde(default)]
    pub is_composite: bool,
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub task: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub completion_configured: bool,
    pub search_configured: bool,
    pub weather_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn error_response(
    status: StatusCode,
    code: &str,
    message: &str,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.into(),
        }),
    )
}

fn agent_not_found() -> (StatusCode, Json<ErrorResponse>) {
    error_response(StatusCode::NOT_FOUND, "AGENT_NOT_FOUND", "Agent not found")
}

/// Counted in characters, not bytes.
fn is_too_short(text: &str) -> bool {
    text.chars().count() < MIN_TEXT_LEN
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness blurb for the root path
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "metagent backend is running" }))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        completion_configured: state.completion_configured,
        search_configured: state.search_configured,
        weather_configured: state.weather_configured,
    })
}

/// Synthesize a new agent from a natural-language requirement
pub async fn create_agent(
    State(state): State<AppState>,
    Json(payload): Json<AgentCreateRequest>,
) -> Result<(StatusCode, Json<AgentDefinition>), (StatusCode, Json<ErrorResponse>)> {
    if is_too_short(&payload.user_requirement) {
        return Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_REQUIREMENT",
            "user_requirement must be at least 3 characters",
        ));
    }

    let definition = state
        .factory
        .create_agent(&payload.user_requirement, payload.is_composite)
        .await;
    state.registry.add(definition.clone()).await;

    tracing::info!("Created agent '{}' ({})", definition.name, definition.agent_id);
    Ok((StatusCode::CREATED, Json(definition)))
}

/// List all stored agents
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    let agents = state.registry.list().await;
    Json(agents.iter().map(AgentSummary::from).collect())
}

/// Fetch one agent definition
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentDefinition>, (StatusCode, Json<ErrorResponse>)> {
    state
        .registry
        .get(&agent_id)
        .await
        .map(Json)
        .ok_or_else(agent_not_found)
}

/// Delete one agent
pub async fn delete_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if state.registry.delete(&agent_id).await {
        tracing::info!("Deleted agent {}", agent_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(agent_not_found())
    }
}

/// Run a task on a stored agent.
///
/// Orchestration never surfaces a 5xx: tool and model failures are folded
/// into the returned `TaskResult`.
pub async fn run_task(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(payload): Json<TaskRequest>,
) -> Result<Json<TaskResult>, (StatusCode, Json<ErrorResponse>)> {
    if is_too_short(&payload.task) {
        return Err(error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_TASK",
            "task must be at least 3 characters",
        ));
    }

    let Some(definition) = state.registry.get(&agent_id).await else {
        return Err(agent_not_found());
    };

    let result = state.runner.run(&definition, &payload.task).await;
    Ok(Json(result))
}
