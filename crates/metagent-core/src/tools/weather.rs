//! Weather Lookup Tool
//!
//! Two-stage lookup over the injected weather backend: resolve the city
//! name to a district code, then fetch either the live report or the
//! multi-day forecast depending on the configured mode.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{Tool, ToolName};
use crate::backends::WeatherBackend;
use crate::error::{AgentError, Result};

/// Which weather product the tool serves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WeatherMode {
    Live,
    Forecast,
}

/// City weather lookup over an injected backend
pub struct WeatherTool {
    backend: Arc<dyn WeatherBackend>,
    mode: WeatherMode,
}

impl WeatherTool {
    /// `parameters` must already be normalized; only `mode` is consumed
    /// here, anything unrecognized falls back to live conditions.
    pub fn new(backend: Arc<dyn WeatherBackend>, parameters: &Map<String, Value>) -> Self {
        let mode = match parameters.get("mode").and_then(Value::as_str) {
            Some("forecast") => WeatherMode::Forecast,
            _ => WeatherMode::Live,
        };
        Self { backend, mode }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> ToolName {
        ToolName::AmapWeather
    }

    async fn run(&self, query: &str) -> Result<String> {
        let city = query.trim();
        if city.is_empty() {
            return Err(AgentError::ToolExecution(
                "Weather query requires a city name, e.g. 'Shanghai' or 'Beijing'".into(),
            ));
        }

        let resolved = self.backend.resolve_city(city).await?;

        match self.mode {
            WeatherMode::Live => {
                let Some(live) = self.backend.live(&resolved.adcode).await? else {
                    return Ok(format!(
                        "No live weather data available for {}.",
                        resolved.name
                    ));
                };
                Ok(format!(
                    "Live weather for {}: {}, {}°C, {} wind force {}, humidity {}%. Reported at {}.",
                    resolved.name,
                    live.condition,
                    live.temperature,
                    live.wind_direction,
                    live.wind_power,
                    live.humidity,
                    live.report_time,
                ))
            }
            WeatherMode::Forecast => {
                let Some(days) = self.backend.forecast(&resolved.adcode).await? else {
                    return Ok(format!(
                        "No forecast data available for {}.",
                        resolved.name
                    ));
                };
                let mut lines = vec![format!(
                    "Weather forecast for {} (next {} days):",
                    resolved.name,
                    days.len()
                )];
                for day in &days {
                    lines.push(format!(
                        "{}: day {} {}°C / night {} {}°C",
                        day.date,
                        day.day_condition,
                        day.day_temp,
                        day.night_condition,
                        day.night_temp,
                    ));
                }
                Ok(lines.join("\n"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{ForecastDay, LiveWeather, MockWeatherBackend};
    use serde_json::json;

    fn mode_params(mode: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("mode".into(), json!(mode));
        map
    }

    fn shanghai_live() -> MockWeatherBackend {
        MockWeatherBackend::new()
            .with_city("310000", "Shanghai")
            .with_live(LiveWeather {
                condition: "Cloudy".into(),
                temperature: "27".into(),
                wind_direction: "SE".into(),
                wind_power: "4".into(),
                humidity: "65".into(),
                report_time: "2024-06-01 10:00:00".into(),
            })
    }

    #[tokio::test]
    async fn test_live_report_formatting() {
        let tool = WeatherTool::new(Arc::new(shanghai_live()), &Map::new());
        let output = tool.run("Shanghai").await.unwrap();
        assert_eq!(
            output,
            "Live weather for Shanghai: Cloudy, 27°C, SE wind force 4, \
             humidity 65%. Reported at 2024-06-01 10:00:00."
        );
    }

    #[tokio::test]
    async fn test_forecast_formatting() {
        let backend = MockWeatherBackend::new()
            .with_city("110000", "Beijing")
            .with_forecast(vec![
                ForecastDay {
                    date: "2024-06-02".into(),
                    day_condition: "Sunny".into(),
                    day_temp: "30".into(),
                    night_condition: "Clear".into(),
                    night_temp: "18".into(),
                },
                ForecastDay {
                    date: "2024-06-03".into(),
                    day_condition: "Rain".into(),
                    day_temp: "24".into(),
                    night_condition: "Rain".into(),
                    night_temp: "17".into(),
                },
            ]);
        let tool = WeatherTool::new(Arc::new(backend), &mode_params("forecast"));

        let output = tool.run("Beijing").await.unwrap();
        assert_eq!(
            output,
            "Weather forecast for Beijing (next 2 days):\n\
             2024-06-02: day Sunny 30°C / night Clear 18°C\n\
             2024-06-03: day Rain 24°C / night Rain 17°C"
        );
    }

    #[tokio::test]
    async fn test_missing_live_record() {
        let backend = MockWeatherBackend::new().with_city("310000", "Shanghai");
        let tool = WeatherTool::new(Arc::new(backend), &Map::new());
        let output = tool.run("Shanghai").await.unwrap();
        assert_eq!(output, "No live weather data available for Shanghai.");
    }

    #[tokio::test]
    async fn test_missing_forecast_record() {
        let backend = MockWeatherBackend::new().with_city("310000", "Shanghai");
        let tool = WeatherTool::new(Arc::new(backend), &mode_params("forecast"));
        let output = tool.run("Shanghai").await.unwrap();
        assert_eq!(output, "No forecast data available for Shanghai.");
    }

    #[tokio::test]
    async fn test_empty_city_fails() {
        let tool = WeatherTool::new(Arc::new(shanghai_live()), &Map::new());
        let err = tool.run("  ").await.unwrap_err();
        assert!(err.to_string().contains("requires a city name"));
    }

    #[tokio::test]
    async fn test_unresolvable_city_fails() {
        let tool = WeatherTool::new(Arc::new(MockWeatherBackend::new()), &Map::new());
        let err = tool.run("Nowhere").await.unwrap_err();
        assert!(err.to_string().contains("Could not resolve"));
    }
}
