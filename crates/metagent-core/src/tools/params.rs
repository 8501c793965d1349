//! Parameter Normalization
//!
//! Validates tool parameters against each tool's small schema before
//! they are stored or used: unknown keys are stripped, values coerced
//! where a safe coercion exists, defaults applied. Normalization never
//! fails; unusable input degrades to the defaults. The output is a
//! fixed point, so re-normalizing stored parameters is a no-op.

use serde_json::{Map, Value};

use super::ToolName;

/// Longest accepted search strategy hint, in characters
const STRATEGY_MAX_CHARS: usize = 64;

/// Normalize a raw parameter mapping for one tool
pub fn normalize_parameters(tool: ToolName, params: &Map<String, Value>) -> Map<String, Value> {
    match tool {
        ToolName::Calculator => Map::new(),
        ToolName::WebSearch => normalize_web_search(params),
        ToolName::AmapWeather => normalize_weather(params),
    }
}

fn normalize_web_search(params: &Map<String, Value>) -> Map<String, Value> {
    let mut normalized = Map::new();

    if let Some(value) = params.get("auto_search") {
        normalized.insert("auto_search".into(), Value::Bool(coerce_bool(value)));
    }

    if let Some(Value::String(strategy)) = params.get("strategy") {
        let capped: String = strategy.trim().chars().take(STRATEGY_MAX_CHARS).collect();
        normalized.insert("strategy".into(), Value::String(capped));
    }

    if let Some(Value::Object(raw)) = params.get("search_params") {
        let primitives: Map<String, Value> = raw
            .iter()
            .filter(|(_, value)| {
                matches!(
                    value,
                    Value::String(_) | Value::Number(_) | Value::Bool(_)
                )
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !primitives.is_empty() {
            normalized.insert("search_params".into(), Value::Object(primitives));
        }
    }

    if !normalized.contains_key("auto_search") {
        normalized.insert("auto_search".into(), Value::Bool(false));
    }

    normalized
}

fn normalize_weather(params: &Map<String, Value>) -> Map<String, Value> {
    let mode = params
        .get("mode")
        .and_then(Value::as_str)
        .map(str::to_lowercase)
        .filter(|mode| mode == "live" || mode == "forecast")
        .unwrap_or_else(|| "live".to_string());

    let mut normalized = Map::new();
    normalized.insert("mode".into(), Value::String(mode));
    normalized
}

/// Boolean coercion for configuration values.
///
/// Strings compare against a small accepted set after trimming and
/// lowercasing; everything else follows its truthiness.
pub(crate) fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(
            text.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}
