//! Environment-Backed Settings
//!
//! All configuration comes from environment variables (optionally via a
//! `.env` file loaded in `main`). Missing credentials are never fatal:
//! the affected collaborator degrades and the server keeps running.

use metagent_runtime::DEFAULT_MODEL;

/// Server configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub environment: String,
    pub bind_addr: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    pub openai_model: String,
    pub google_search_api_key: Option<String>,
    pub google_search_cx: Option<String>,
    pub amap_api_key: Option<String>,
    pub agents_store_path: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            app_name: env_or("APP_NAME", "metagent backend"),
            environment: env_or("ENVIRONMENT", "local"),
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8000"),
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_api_base: non_empty("OPENAI_API_BASE"),
            openai_model: env_or("OPENAI_MODEL", DEFAULT_MODEL),
            google_search_api_key: non_empty("GOOGLE_SEARCH_API_KEY"),
            google_search_cx: non_empty("GOOGLE_SEARCH_CX"),
            amap_api_key: non_empty("AMAP_API_KEY"),
            agents_store_path: env_or("AGENTS_STORE_PATH", "data/agents.json"),
        }
    }
}

/// Variable value, or `default` when unset or blank.
fn env_or(key: &str, default: &str) -> String {
    non_empty(key).unwrap_or_else(|| default.to_string())
}

/// Variable value, treating unset and blank the same way.
fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // No `set_var` here: tests run in parallel.

    #[test]
    fn env_or_falls_back_for_unset_variable() {
        assert_eq!(
            env_or("METAGENT_SETTING_THAT_DOES_NOT_EXIST", "fallback"),
            "fallback"
        );
    }

    #[test]
    fn non_empty_returns_none_for_unset_variable() {
        assert_eq!(non_empty("METAGENT_SETTING_THAT_DOES_NOT_EXIST"), None);
    }
}
