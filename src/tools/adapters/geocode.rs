//! Place name lookup through OpenWeatherMap direct geocoding

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

/// "Not found" is an answer, not a failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeocodeResult {
    Found {
        name: String,
        latitude: f64,
        longitude: f64,
        country: Option<String>,
        state: Option<String>,
    },
    NotFound {
        query: String,
    },
}

#[derive(Debug, Deserialize)]
struct GeocodeArgs {
    place: String,
}

#[derive(Debug, Deserialize)]
struct DirectMatch {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

pub struct GeocodeAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl GeocodeAdapter {
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
impl FetchAdapter for GeocodeAdapter {
    fn declaration(&self) -> ToolDeclaration {
        crate::tool_declaration! {
            name: "geocode_location",
            description: "Resolve a free-text place name to coordinates and its canonical name.",
            parameters: [
                {
                    name: "place",
                    type: "string",
                    description: "Place name, e.g. 'Kampung Melayu, Jakarta'",
                    required: true
                }
            ]
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError> {
        let args: GeocodeArgs = args.parse()?;
        let place = args.place.trim();
        if place.is_empty() {
            return Err(AdapterError::InvalidInput("place must not be empty".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(AdapterError::NotConfigured("geocoding credential".to_string()));
        }

        let url = format!("{}/direct", self.base_url);
        let query = [
            ("q", place.to_string()),
            ("limit", "1".to_string()),
            ("appid", self.api_key.clone()),
        ];
        let matches: Vec<DirectMatch> = get_json(&self.client, &url, &query).await?;

        let result = match matches.into_iter().next() {
            Some(m) => GeocodeResult::Found {
                name: m.name,
                latitude: m.lat,
                longitude: m.lon,
                country: m.country,
                state: m.state,
            },
            None => {
                tracing::debug!("No geocoding match for '{}'", place);
                GeocodeResult::NotFound {
                    query: place.to_string(),
                }
            }
        };
        to_payload(&result)
    }
}
