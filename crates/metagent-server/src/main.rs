//! metagent HTTP Server
//!
//! Axum-based server exposing agent synthesis, the agent registry, and
//! task execution over a JSON REST API.

mod handlers;
mod registry;
mod settings;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use metagent_core::{AgentFactory, CompletionClient, TaskRunner, ToolBackends};
use metagent_runtime::{http_client, AmapWeatherBackend, GoogleSearchBackend, OpenAiCompletion};

use crate::handlers::{
    create_agent, delete_agent, get_agent, health_check, list_agents, root, run_task,
};
use crate::registry::AgentRegistry;
use crate::settings::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    tracing::info!("{} starting ({})", settings.app_name, settings.environment);

    // Completion client is optional; planning and composition degrade without it
    let completion: Option<Arc<dyn CompletionClient>> = match settings.openai_api_key.clone() {
        Some(api_key) => {
            let client = match settings.openai_api_base.clone() {
                Some(api_base) => OpenAiCompletion::with_base_url(
                    api_key,
                    settings.openai_model.clone(),
                    api_base,
                ),
                None => OpenAiCompletion::new(api_key, settings.openai_model.clone()),
            };
            tracing::info!("✓ Completion model: {}", settings.openai_model);
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("⚠ OPENAI_API_KEY not set - agents run without a language model");
            None
        }
    };

    if settings.google_search_api_key.is_none() || settings.google_search_cx.is_none() {
        tracing::warn!("⚠ Google search credentials not set - web_search calls will fail");
    }
    if settings.amap_api_key.is_none() {
        tracing::warn!("⚠ AMAP_API_KEY not set - amap_weather calls will fail");
    }

    // One HTTP client shared by the outbound backends
    let http = http_client()?;
    let backends = ToolBackends {
        search: Arc::new(GoogleSearchBackend::new(
            http.clone(),
            settings.google_search_api_key.clone(),
            settings.google_search_cx.clone(),
        )),
        weather: Arc::new(AmapWeatherBackend::new(http, settings.amap_api_key.clone())),
    };

    let registry = Arc::new(AgentRegistry::open(&settings.agents_store_path));
    tracing::info!(
        "Loaded {} saved agents from {}",
        registry.count().await,
        settings.agents_store_path
    );

    // Build application state
    let state = AppState {
        registry,
        factory: Arc::new(AgentFactory::new(completion.clone())),
        runner: Arc::new(TaskRunner::new(completion, backends)),
        completion_configured: settings.openai_api_key.is_some(),
        search_configured: settings.google_search_api_key.is_some()
            && settings.google_search_cx.is_some(),
        weather_configured: settings.amap_api_key.is_some(),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/agents", post(create_agent).get(list_agents))
        .route("/api/agents/{agent_id}", get(get_agent).delete(delete_agent))
        .route("/api/agents/{agent_id}/tasks", post(run_task))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 metagent server running on http://{}", settings.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /api/health                  - Health check");
    tracing::info!("  POST   /api/agents                  - Create an agent");
    tracing::info!("  GET    /api/agents                  - List agents");
    tracing::info!("  GET    /api/agents/{{agent_id}}       - Fetch an agent");
    tracing::info!("  DELETE /api/agents/{{agent_id}}       - Delete an agent");
    tracing::info!("  POST   /api/agents/{{agent_id}}/tasks - Run a task");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
