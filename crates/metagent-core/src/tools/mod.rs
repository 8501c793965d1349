//! Tool System
//!
//! The closed tool set, the object-safe [`Tool`] contract, and the
//! per-agent [`ToolBox`] binding configurations to runnable instances.

mod calculator;
mod params;
mod search;
mod weather;

pub use calculator::CalculatorTool;
pub use params::normalize_parameters;
pub use search::SearchTool;
pub use weather::WeatherTool;

pub(crate) use params::coerce_bool;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::backends::ToolBackends;
use crate::error::{AgentError, Result};
use crate::model::ToolConfig;

/// The closed set of tools an agent can be granted.
///
/// Adding a capability means adding a variant here and a construction
/// arm in [`ToolBox::new`]; nothing else dispatches on tool names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Calculator,
    WebSearch,
    AmapWeather,
}

impl ToolName {
    /// Every member of the closed set, in catalog order
    pub const ALL: [Self; 3] = [Self::Calculator, Self::WebSearch, Self::AmapWeather];

    /// Wire name, as stored and as models address tools
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calculator => "calculator",
            Self::WebSearch => "web_search",
            Self::AmapWeather => "amap_weather",
        }
    }

    /// Parse a wire name; `None` for anything outside the closed set
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "calculator" => Some(Self::Calculator),
            "web_search" => Some(Self::WebSearch),
            "amap_weather" => Some(Self::AmapWeather),
            _ => None,
        }
    }

    /// One-line capability description used in planning prompts
    pub const fn capability(self) -> &'static str {
        match self {
            Self::Calculator => "evaluate arithmetic expressions with + - * / and parentheses",
            Self::WebSearch => "search the web for fresh information via Google Programmable Search",
            Self::AmapWeather => "look up live or forecast weather for a city via AMap",
        }
    }

    /// Selection catalog shown to the agent factory model: name,
    /// description, and a sketch of the accepted parameters.
    pub fn catalog() -> serde_json::Value {
        json!([
            {
                "name": Self::Calculator.as_str(),
                "description": Self::Calculator.capability(),
                "parameters": {}
            },
            {
                "name": Self::WebSearch.as_str(),
                "description": Self::WebSearch.capability(),
                "parameters": {
                    "auto_search": "boolean, search proactively for every task",
                    "strategy": "string, free-form hint for the planner",
                    "search_params": "object, raw query overrides such as num or hl"
                }
            },
            {
                "name": Self::AmapWeather.as_str(),
                "description": Self::AmapWeather.capability(),
                "parameters": {
                    "mode": "string, 'live' or 'forecast'"
                }
            }
        ])
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A runnable capability bound to one agent's configuration
#[async_trait]
pub trait Tool: Send + Sync {
    /// Which member of the closed set this instance is
    fn name(&self) -> ToolName;

    /// Execute with a free-form query, returning formatted output
    async fn run(&self, query: &str) -> Result<String>;
}

/// An agent's tool configurations bound to concrete instances.
///
/// Built fresh for every task. Duplicate names replace the earlier
/// instance while keeping its position, so the last configuration wins
/// without reordering the set.
pub struct ToolBox {
    tools: Vec<(ToolName, Arc<dyn Tool>)>,
}

impl ToolBox {
    /// Instantiate every configured tool over the given backends.
    ///
    /// Parameters are normalized before use, so definitions edited
    /// outside the factory still get schema-clean values.
    pub fn new(configs: &[ToolConfig], backends: &ToolBackends) -> Self {
        let mut tools: Vec<(ToolName, Arc<dyn Tool>)> = Vec::new();
        for config in configs {
            let parameters = normalize_parameters(config.name, &config.parameters);
            let tool: Arc<dyn Tool> = match config.name {
                ToolName::Calculator => Arc::new(CalculatorTool),
                ToolName::WebSearch => {
                    Arc::new(SearchTool::new(backends.search.clone(), &parameters))
                }
                ToolName::AmapWeather => {
                    Arc::new(WeatherTool::new(backends.weather.clone(), &parameters))
                }
            };
            match tools.iter_mut().find(|(name, _)| *name == config.name) {
                Some(slot) => slot.1 = tool,
                None => tools.push((config.name, tool)),
            }
        }
        Self { tools }
    }

    /// Run a configured tool, or fail when the agent was not granted it
    pub async fn run(&self, name: ToolName, query: &str) -> Result<String> {
        match self.tools.iter().find(|(configured, _)| *configured == name) {
            Some((_, tool)) => tool.run(query).await,
            None => Err(AgentError::ToolUnavailable(name)),
        }
    }

    /// Configured tool names, in configuration order
    pub fn available_tool_names(&self) -> Vec<ToolName> {
        self.tools.iter().map(|(name, _)| *name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
