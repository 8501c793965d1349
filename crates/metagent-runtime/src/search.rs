//! Google Programmable Search Backend
//!
//! One GET per search against the Custom Search JSON API. Credentials
//! are optional at construction; a missing key or engine id fails each
//! call fast, without network traffic.

use async_trait::async_trait;
use serde::Deserialize;

use metagent_core::backends::{SearchBackend, SearchHit};
use metagent_core::error::{AgentError, Result};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Google Programmable Search over an injected HTTP client
pub struct GoogleSearchBackend {
    http: reqwest::Client,
    api_key: Option<String>,
    cx: Option<String>,
}

impl GoogleSearchBackend {
    pub fn new(http: reqwest::Client, api_key: Option<String>, cx: Option<String>) -> Self {
        Self { http, api_key, cx }
    }
}

/// Error for a non-2xx reply
fn status_error(status: reqwest::StatusCode, body: String) -> AgentError {
    tracing::warn!(%status, "Google search request rejected");
    AgentError::ToolExecution(format!("Google search failed with status {status}: {body}"))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

impl SearchItem {
    fn into_hit(self) -> SearchHit {
        SearchHit {
            title: self.title.unwrap_or_default(),
            snippet: self.snippet.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl SearchBackend for GoogleSearchBackend {
    async fn search(&self, query: &str, params: &[(String, String)]) -> Result<Vec<SearchHit>> {
        let (Some(api_key), Some(cx)) = (self.api_key.as_deref(), self.cx.as_deref()) else {
            return Err(AgentError::ToolExecution(
                "Google Search API key or engine id is not configured".into(),
            ));
        };

        // credentials and query first; caller params may override any
        // of them, replacing in place rather than duplicating the key
        let mut request_params: Vec<(String, String)> = vec![
            ("key".to_string(), api_key.to_string()),
            ("cx".to_string(), cx.to_string()),
            ("q".to_string(), query.to_string()),
        ];
        for (name, value) in params {
            match request_params.iter_mut().find(|(existing, _)| existing == name) {
                Some(slot) => slot.1 = value.clone(),
                None => request_params.push((name.clone(), value.clone())),
            }
        }

        let response = self
            .http
            .get(SEARCH_ENDPOINT)
            .query(&request_params)
            .send()
            .await
            .map_err(|e| AgentError::ToolExecution(format!("Google search request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let payload: SearchResponse = response.json().await.map_err(|e| {
            AgentError::ToolExecution(format!("Google search returned an unreadable payload: {e}"))
        })?;
        Ok(payload.items.into_iter().map(SearchItem::into_hit).collect())
    }
}
