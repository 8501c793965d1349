//! Application State

use std::sync::Arc;

use metagent_core::{AgentFactory, TaskRunner};

use crate::registry::AgentRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Persistent agent store
    pub registry: Arc<AgentRegistry>,

    /// Synthesizes agent definitions from user requirements
    pub factory: Arc<AgentFactory>,

    /// Executes tasks against stored agents
    pub runner: Arc<TaskRunner>,

    /// True when an OpenAI API key was provided at startup
    pub completion_configured: bool,

    /// True when Google search credentials were provided
    pub search_configured: bool,

    /// True when an AMap key was provided
    pub weather_configured: bool,
}
