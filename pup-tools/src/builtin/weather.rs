//! Current weather capability backed by the Open-Meteo public APIs
//! (geocoding then forecast; no API key required).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use pup_core::tool::{ParamSpec, ParamType, ToolCapability, ToolExecutionError};

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

pub struct GetWeatherTool {
    http: reqwest::Client,
}

impl GetWeatherTool {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("pup/0.1")
            .build()?;
        Ok(Self { http })
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    latitude: f64,
    longitude: f64,
    name: String,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature_2m: f64,
    weather_code: u32,
}

#[async_trait]
impl ToolCapability for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required(
                "location",
                ParamType::String,
                "City or place name to get weather for",
            ),
            ParamSpec::optional(
                "unit",
                ParamType::Enum(vec!["celsius".into(), "fahrenheit".into()]),
                "Temperature unit",
            )
            .with_default(json!("celsius")),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<String, ToolExecutionError> {
        let location = arguments
            .get("location")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolExecutionError::new("location argument missing"))?;
        let unit = arguments
            .get("unit")
            .and_then(Value::as_str)
            .unwrap_or("celsius");

        let place = self.geocode(location).await?;
        let weather = self.forecast(&place, unit).await?;

        let location_label = match &place.country {
            Some(country) => format!("{}, {}", place.name, country),
            None => place.name.clone(),
        };
        let unit_symbol = if unit == "fahrenheit" { "F" } else { "C" };
        Ok(format!(
            "The weather in {location_label} is {}\u{b0}{unit_symbol} with {}",
            weather.temperature_2m,
            describe_weather_code(weather.weather_code)
        ))
    }
}

impl GetWeatherTool {
    async fn geocode(&self, location: &str) -> Result<GeocodeResult, ToolExecutionError> {
        let response: GeocodeResponse = self
            .http
            .get(GEOCODING_URL)
            .query(&[("name", location), ("count", "1")])
            .send()
            .await
            .map_err(|e| ToolExecutionError::new(format!("geocoding request failed: {e}")))?
            .error_for_status()
            .map_err(|e| ToolExecutionError::new(format!("geocoding request failed: {e}")))?
            .json()
            .await
            .map_err(|e| ToolExecutionError::new(format!("geocoding response unreadable: {e}")))?;

        response.results.into_iter().next().ok_or_else(|| {
            ToolExecutionError::new(format!("could not find coordinates for location: {location}"))
        })
    }

    async fn forecast(
        &self,
        place: &GeocodeResult,
        unit: &str,
    ) -> Result<CurrentWeather, ToolExecutionError> {
        let response: ForecastResponse = self
            .http
            .get(FORECAST_URL)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                ("current", "temperature_2m,weather_code".to_string()),
                ("temperature_unit", unit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolExecutionError::new(format!("forecast request failed: {e}")))?
            .error_for_status()
            .map_err(|e| ToolExecutionError::new(format!("forecast request failed: {e}")))?
            .json()
            .await
            .map_err(|e| ToolExecutionError::new(format!("forecast response unreadable: {e}")))?;

        Ok(response.current)
    }
}

/// WMO weather interpretation codes, per the Open-Meteo docs.
fn describe_weather_code(code: u32) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "fog",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "dense drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        71 => "slight snow",
        73 => "moderate snow",
        75 => "heavy snow",
        77 => "snow grains",
        80 => "slight rain showers",
        81 => "moderate rain showers",
        82 => "violent rain showers",
        85 => "slight snow showers",
        86 => "heavy snow showers",
        95 => "thunderstorm",
        96 => "thunderstorm with slight hail",
        99 => "thunderstorm with heavy hail",
        _ => "unknown conditions",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pup_core::tool::call_schema;

    #[test]
    fn schema_requires_only_location() {
        let tool = GetWeatherTool::new().unwrap();
        let schema = call_schema(&tool);
        assert_eq!(schema["function"]["parameters"]["required"], json!(["location"]));
        assert_eq!(
            schema["function"]["parameters"]["properties"]["unit"]["default"],
            json!("celsius")
        );
    }

    #[test]
    fn weather_codes_cover_the_common_table() {
        assert_eq!(describe_weather_code(0), "clear sky");
        assert_eq!(describe_weather_code(95), "thunderstorm");
        assert_eq!(describe_weather_code(42), "unknown conditions");
    }

    #[test]
    fn geocode_response_tolerates_missing_results() {
        let parsed: GeocodeResponse = serde_json::from_str(r#"{"generationtime_ms": 0.5}"#).unwrap();
        assert!(parsed.results.is_empty());
    }
}
