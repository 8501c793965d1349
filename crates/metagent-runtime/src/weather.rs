//! AMap District and Weather Backend
//!
//! Two-call contract against the AMap web API: a district lookup turns
//! a city name into an adcode, then the weather query selects live or
//! forecast data through the `extensions` parameter.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use metagent_core::backends::{ForecastDay, LiveWeather, ResolvedCity, WeatherBackend};
use metagent_core::error::{AgentError, Result};

const DISTRICT_ENDPOINT: &str = "https://restapi.amap.com/v3/config/district";
const WEATHER_ENDPOINT: &str = "https://restapi.amap.com/v3/weather/weatherInfo";

/// AMap lookups over an injected HTTP client
pub struct AmapWeatherBackend {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl AmapWeatherBackend {
    pub fn new(http: reqwest::Client, api_key: Option<String>) -> Self {
        Self { http, api_key }
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AgentError::ToolExecution("AMAP_API_KEY is not configured".into()))
    }

    async fn get_json<T>(&self, endpoint: &str, label: &str, params: &[(&str, &str)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .http
            .get(endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| AgentError::ToolExecution(format!("{label} request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "{} rejected the request", label);
            return Err(AgentError::ToolExecution(format!(
                "{label} failed with status {status}: {body}"
            )));
        }

        response.json().await.map_err(|e| {
            AgentError::ToolExecution(format!("{label} returned an unreadable payload: {e}"))
        })
    }
}

#[derive(Debug, Deserialize)]
struct DistrictResponse {
    /// "1" on success; anything else is a lookup failure
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    districts: Vec<District>,
}

#[derive(Debug, Deserialize)]
struct District {
    #[serde(default)]
    name: Option<String>,
    /// Kept raw: the service serializes absent codes as empty arrays
    #[serde(default)]
    adcode: Value,
    #[serde(default)]
    citycode: Value,
}

impl District {
    /// Usable district code: adcode preferred, citycode as fallback
    fn code(&self) -> Option<String> {
        string_code(&self.adcode).or_else(|| string_code(&self.citycode))
    }
}

fn string_code(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|code| !code.is_empty())
        .map(str::to_string)
}

/// City resolution from a district payload; the queried name is the
/// fallback when the matched district carries none
fn usable_district(payload: DistrictResponse, city: &str) -> Result<ResolvedCity> {
    if payload.status.as_deref() != Some("1") || payload.districts.is_empty() {
        tracing::warn!(
            status = payload.status.as_deref().unwrap_or(""),
            "AMap district lookup returned no match"
        );
        return Err(AgentError::ToolExecution(
            "Could not resolve the city to a district code; check the city name".into(),
        ));
    }

    let district = &payload.districts[0];
    let adcode = district.code().ok_or_else(|| {
        AgentError::ToolExecution("District lookup returned no usable adcode".into())
    })?;
    let name = district
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| city.to_string());

    Ok(ResolvedCity { adcode, name })
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    lives: Vec<LiveRecord>,
    #[serde(default)]
    forecasts: Vec<ForecastRecord>,
}

#[derive(Debug, Deserialize)]
struct LiveRecord {
    #[serde(default)]
    weather: String,
    #[serde(default)]
    temperature: String,
    #[serde(default)]
    winddirection: String,
    #[serde(default)]
    windpower: String,
    #[serde(default)]
    humidity: String,
    #[serde(default)]
    reporttime: String,
}

#[derive(Debug, Deserialize)]
struct ForecastRecord {
    #[serde(default)]
    casts: Vec<CastRecord>,
}

#[derive(Debug, Deserialize)]
struct CastRecord {
    #[serde(default)]
    date: String,
    #[serde(default)]
    dayweather: String,
    #[serde(default)]
    daytemp: String,
    #[serde(default)]
    nightweather: String,
    #[serde(default)]
    nighttemp: String,
}

#[async_trait]
impl WeatherBackend for AmapWeatherBackend {
    async fn resolve_city(&self, city: &str) -> Result<ResolvedCity> {
        let key = self.api_key()?;
        let payload: DistrictResponse = self
            .get_json(
                DISTRICT_ENDPOINT,
                "AMap district lookup",
                &[("key", key), ("keywords", city), ("subdistrict", "0")],
            )
            .await?;
        usable_district(payload, city)
    }

    async fn live(&self, adcode: &str) -> Result<Option<LiveWeather>> {
        let key = self.api_key()?;
        let payload: WeatherResponse = self
            .get_json(
                WEATHER_ENDPOINT,
                "AMap weather",
                &[("key", key), ("city", adcode), ("extensions", "base")],
            )
            .await?;

        Ok(payload.lives.into_iter().next().map(|live| LiveWeather {
            condition: live.weather,
            temperature: live.temperature,
            wind_direction: live.winddirection,
            wind_power: live.windpower,
            humidity: live.humidity,
            report_time: live.reporttime,
        }))
    }

    async fn forecast(&self, adcode: &str) -> Result<Option<Vec<ForecastDay>>> {
        let key = self.api_key()?;
        let payload: WeatherResponse = self
            .get_json(
                WEATHER_ENDPOINT,
                "AMap weather",
                &[("key", key), ("city", adcode), ("extensions", "all")],
            )
            .await?;

        Ok(payload.forecasts.into_iter().next().map(|forecast| {
            forecast
                .casts
                .into_iter()
                .map(|cast| ForecastDay {
                    date: cast.date,
                    day_condition: cast.dayweather,
                    day_temp: cast.daytemp,
                    night_condition: cast.nightweather,
                    night_temp: cast.nighttemp,
                })
                .collect()
        }))
    }
}
