//! Current conditions from OpenWeatherMap

use super::{get_json, to_payload};
use crate::config::ProviderConfig;
use crate::error::AdapterError;
use crate::tools::schema::ValidatedArgs;
use crate::tools::{FetchAdapter, ToolDeclaration};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub condition: String,
    pub description: String,
    pub temperature_c: f64,
    pub feels_like_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub rain_1h_mm: Option<f64>,
    pub observed_at_unix: i64,
}

#[derive(Debug, Deserialize)]
struct WeatherArgs {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainReadings,
    wind: Option<Wind>,
    rain: Option<Rain>,
    name: Option<String>,
    dt: i64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Rain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

pub struct WeatherAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl WeatherAdapter {
    pub fn new(client: Client, config: &ProviderConfig, api_key: String) -> Self {
        Self {
            client,
            base_url: config.base().to_string(),
            api_key,
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl FetchAdapter for WeatherAdapter {
    fn declaration(&self) -> ToolDeclaration {
        crate::tool_declaration! {
            name: "get_weather",
            description: "Current weather at a coordinate: conditions, temperature, humidity, wind \
                          and rainfall in the last hour. Use geocode_location first to get coordinates.",
            parameters: [
                {
                    name: "latitude",
                    type: "number",
                    description: "Latitude in decimal degrees",
                    required: true
                },
                {
                    name: "longitude",
                    type: "number",
                    description: "Longitude in decimal degrees",
                    required: true
                }
            ]
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError> {
        let args: WeatherArgs = args.parse()?;
        if !(-90.0..=90.0).contains(&args.latitude) || !(-180.0..=180.0).contains(&args.longitude) {
            return Err(AdapterError::InvalidInput(format!(
                "coordinates out of range: {}, {}",
                args.latitude, args.longitude
            )));
        }
        if self.api_key.is_empty() {
            return Err(AdapterError::NotConfigured("weather provider credential".to_string()));
        }

        let url = format!("{}/weather", self.base_url);
        let query = [
            ("lat", args.latitude.to_string()),
            ("lon", args.longitude.to_string()),
            ("units", "metric".to_string()),
            ("appid", self.api_key.clone()),
        ];
        let current: CurrentWeather = get_json(&self.client, &url, &query).await?;

        let (condition, description) = current
            .weather
            .into_iter()
            .next()
            .map(|c| (c.main, c.description))
            .unwrap_or_else(|| ("Unknown".to_string(), String::new()));

        let snapshot = WeatherSnapshot {
            location: current.name.filter(|n| !n.is_empty()),
            latitude: args.latitude,
            longitude: args.longitude,
            condition,
            description,
            temperature_c: current.main.temp,
            feels_like_c: current.main.feels_like,
            humidity_pct: current.main.humidity,
            pressure_hpa: current.main.pressure,
            wind_speed_ms: current.wind.and_then(|w| w.speed),
            rain_1h_mm: current.rain.and_then(|r| r.one_hour),
            observed_at_unix: current.dt,
        };
        to_payload(&snapshot)
    }
}
