//! Agent Registry
//!
//! In-memory agent store mirrored to a JSON file so definitions survive
//! restarts. The in-memory map is the source of truth for the running
//! process: save failures are logged and never propagated to callers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use metagent_core::AgentDefinition;

/// Registry of synthesized agents with JSON-file persistence.
pub struct AgentRegistry {
    agents: RwLock<HashMap<String, AgentDefinition>>,
    store_path: PathBuf,
}

impl AgentRegistry {
    /// Opens the registry at `store_path`, loading any saved agents.
    ///
    /// A missing file starts an empty registry. A file that is not a JSON
    /// array also starts empty (logged); individual entries that fail to
    /// deserialize are skipped with a warning so one bad record cannot
    /// take the rest of the store down.
    pub fn open(store_path: impl Into<PathBuf>) -> Self {
        let store_path = store_path.into();
        let agents = load_snapshot(&store_path);
        Self {
            agents: RwLock::new(agents),
            store_path,
        }
    }

    /// Inserts or replaces an agent, then saves the snapshot.
    pub async fn add(&self, definition: AgentDefinition) {
        let mut agents = self.agents.write().await;
        agents.insert(definition.agent_id.clone(), definition);
        self.persist(&agents).await;
    }

    pub async fn get(&self, agent_id: &str) -> Option<AgentDefinition> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// All stored agents, newest first.
    pub async fn list(&self) -> Vec<AgentDefinition> {
        let agents = self.agents.read().await;
        let mut all: Vec<AgentDefinition> = agents.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }

    /// Removes an agent and saves. Unknown ids return `false` without
    /// touching the store.
    pub async fn delete(&self, agent_id: &str) -> bool {
        let mut agents = self.agents.write().await;
        if agents.remove(agent_id).is_none() {
            return false;
        }
        self.persist(&agents).await;
        true
    }

    pub async fn count(&self) -> usize {
        self.agents.read().await.len()
    }

    async fn persist(&self, agents: &HashMap<String, AgentDefinition>) {
        let mut all: Vec<&AgentDefinition> = agents.values().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let payload = match serde_json::to_string_pretty(&all) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to serialize the agent store: {}", e);
                return;
            }
        };

        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    tracing::error!("Failed to create {}: {}", parent.display(), e);
                    return;
                }
            }
        }

        if let Err(e) = tokio::fs::write(&self.store_path, payload).await {
            tracing::error!(
                "Failed to save agents to {}: {}",
                self.store_path.display(),
                e
            );
        }
    }
}

fn load_snapshot(path: &Path) -> HashMap<String, AgentDefinition> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return HashMap::new(),
    };

    let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Agent store {} is not a JSON array: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let mut agents = HashMap::new();
    for entry in entries {
        match serde_json::from_value::<AgentDefinition>(entry) {
            Ok(definition) => {
                agents.insert(definition.agent_id.clone(), definition);
            }
            Err(e) => tracing::warn!("Skipping malformed agent entry: {}", e),
        }
    }
    agents
}
