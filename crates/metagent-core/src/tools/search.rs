//! Web Search Tool
//!
//! Formats web search results for downstream composition. The request
//! starts from fixed defaults (result count, safe mode, locale) and the
//! agent's `search_params` overrides are overlaid on top.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Tool, ToolName};
use crate::backends::SearchBackend;
use crate::error::{AgentError, Result};

const DEFAULT_RESULT_COUNT: &str = "3";
const DEFAULT_SAFE_MODE: &str = "active";
const DEFAULT_LOCALE: &str = "zh-CN";

const NO_RESULTS_MESSAGE: &str =
    "Google search returned no results; try adjusting the keywords.";
const UNTITLED_RESULT: &str = "Untitled result";

/// Web search over an injected backend
pub struct SearchTool {
    backend: Arc<dyn SearchBackend>,
    overrides: Vec<(String, String)>,
}

impl SearchTool {
    /// `parameters` must already be normalized; only `search_params`
    /// is consumed here.
    pub fn new(backend: Arc<dyn SearchBackend>, parameters: &Map<String, Value>) -> Self {
        let overrides = parameters
            .get("search_params")
            .and_then(Value::as_object)
            .map(|raw| {
                raw.iter()
                    .map(|(key, value)| (key.clone(), query_value(value)))
                    .collect()
            })
            .unwrap_or_default();
        Self { backend, overrides }
    }

    /// Defaults overlaid by the configured overrides; an override of an
    /// existing key replaces it in place.
    fn request_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("num".to_string(), DEFAULT_RESULT_COUNT.to_string()),
            ("safe".to_string(), DEFAULT_SAFE_MODE.to_string()),
            ("hl".to_string(), DEFAULT_LOCALE.to_string()),
        ];
        for (key, value) in &self.overrides {
            match params.iter_mut().find(|(existing, _)| existing == key) {
                Some(slot) => slot.1 = value.clone(),
                None => params.push((key.clone(), value.clone())),
            }
        }
        params
    }
}

/// Query-string rendering for primitive JSON values
fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> ToolName {
        ToolName::WebSearch
    }

    async fn run(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::ToolExecution(
                "Web search received an empty query".into(),
            ));
        }

        let hits = self.backend.search(query, &self.request_params()).await?;
        if hits.is_empty() {
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }

        let blocks: Vec<String> = hits
            .iter()
            .map(|hit| {
                let title = if hit.title.is_empty() {
                    UNTITLED_RESULT
                } else {
                    &hit.title
                };
                let snippet = hit.snippet.replace('\n', " ");
                format!("{title}\n{snippet}\nSource: {}", hit.link)
            })
            .collect();
        Ok(blocks.join("\n\n"))
    }
}
