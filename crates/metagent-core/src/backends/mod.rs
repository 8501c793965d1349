//! Retrieval Backends
//!
//! Collaborator contracts for the information services the tools call
//! out to. Production implementations live in `metagent-runtime`; the
//! mocks here keep the core fully testable offline.

mod mock;

pub use mock::{MockSearchBackend, MockWeatherBackend};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// One web search result
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    /// May be empty; the search tool substitutes a placeholder title
    pub title: String,
    pub snippet: String,
    pub link: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            link: link.into(),
        }
    }
}

/// A city name resolved to a district code
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCity {
    /// AMap adcode (or citycode when no adcode exists)
    pub adcode: String,
    /// Official district name; falls back to the queried name
    pub name: String,
}

/// Current conditions for one district.
///
/// All fields stay as reported text; the service publishes every value
/// as a string and the tool only formats them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiveWeather {
    pub condition: String,
    pub temperature: String,
    pub wind_direction: String,
    pub wind_power: String,
    pub humidity: String,
    pub report_time: String,
}

/// One forecast day
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForecastDay {
    pub date: String,
    pub day_condition: String,
    pub day_temp: String,
    pub night_condition: String,
    pub night_temp: String,
}

/// Web search collaborator.
///
/// `params` carries the fully merged request parameters (result count,
/// safe mode, locale, plus per-agent overrides). One request per call;
/// missing credentials fail fast without any network traffic.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, params: &[(String, String)]) -> Result<Vec<SearchHit>>;
}

/// Weather collaborator, split along the upstream two-call contract:
/// resolve the city first, then query by district code.
#[async_trait]
pub trait WeatherBackend: Send + Sync {
    /// Resolve a city name to a district code. Fails when the service
    /// cannot match the name.
    async fn resolve_city(&self, city: &str) -> Result<ResolvedCity>;

    /// Live conditions for a district code; `None` when the service has
    /// no live record.
    async fn live(&self, adcode: &str) -> Result<Option<LiveWeather>>;

    /// Forecast for a district code; `None` when the service has no
    /// forecast record. A present record may still contain zero days.
    async fn forecast(&self, adcode: &str) -> Result<Option<Vec<ForecastDay>>>;
}

/// The backend bundle handed to every tool box; cheap to clone.
#[derive(Clone)]
pub struct ToolBackends {
    pub search: Arc<dyn SearchBackend>,
    pub weather: Arc<dyn WeatherBackend>,
}
