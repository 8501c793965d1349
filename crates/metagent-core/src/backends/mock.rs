//! Mock Retrieval Backends
//!
//! Canned-data implementations for tests and offline runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ForecastDay, LiveWeather, ResolvedCity, SearchBackend, SearchHit, WeatherBackend};
use crate::error::{AgentError, Result};

/// Search backend that returns a fixed hit list (or a fixed failure)
/// and records every request it receives.
#[derive(Default)]
pub struct MockSearchBackend {
    hits: Vec<SearchHit>,
    failure: Option<String>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockSearchBackend {
    /// Backend that returns the given hits for every query
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    /// Backend that finds nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Backend that fails every request with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Requests observed so far, as `(query, params)` pairs
    pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn search(&self, query: &str, params: &[(String, String)]) -> Result<Vec<SearchHit>> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push((query.to_string(), params.to_vec()));
        match &self.failure {
            Some(message) => Err(AgentError::ToolExecution(message.clone())),
            None => Ok(self.hits.clone()),
        }
    }
}

/// Weather backend with canned resolution, live, and forecast data.
///
/// An unset city makes resolution fail, which is how tests exercise the
/// unknown-city path.
#[derive(Default)]
pub struct MockWeatherBackend {
    city: Option<ResolvedCity>,
    live: Option<LiveWeather>,
    forecast: Option<Vec<ForecastDay>>,
}

impl MockWeatherBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every query to the given district
    #[must_use]
    pub fn with_city(mut self, adcode: impl Into<String>, name: impl Into<String>) -> Self {
        self.city = Some(ResolvedCity {
            adcode: adcode.into(),
            name: name.into(),
        });
        self
    }

    /// Serve the given live record
    #[must_use]
    pub fn with_live(mut self, live: LiveWeather) -> Self {
        self.live = Some(live);
        self
    }

    /// Serve the given forecast days
    #[must_use]
    pub fn with_forecast(mut self, days: Vec<ForecastDay>) -> Self {
        self.forecast = Some(days);
        self
    }
}

#[async_trait]
impl WeatherBackend for MockWeatherBackend {
    async fn resolve_city(&self, _city: &str) -> Result<ResolvedCity> {
        self.city.clone().ok_or_else(|| {
            AgentError::ToolExecution(
                "Could not resolve the city to a district code; check the city name".into(),
            )
        })
    }

    async fn live(&self, _adcode: &str) -> Result<Option<LiveWeather>> {
        Ok(self.live.clone())
    }

    async fn forecast(&self, _adcode: &str) -> Result<Option<Vec<ForecastDay>>> {
        Ok(self.forecast.clone())
    }
}
