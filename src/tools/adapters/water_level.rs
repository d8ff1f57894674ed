//! Water level readings from the flood-monitoring gateway

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
pub struct WaterLevelReading {
    pub station: String,
    #[serde(default)]
    pub region: Option<String>,
    pub level_cm: f64,
    /// Gateway alert status, e.g. "normal", "siaga 3"
    pub alert_level: String,
    pub observed_at: String,
}

#[derive(Debug, Deserialize)]
struct WaterLevelArgs {
    region: Option<String>,
}

pub struct WaterLevelAdapter {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl WaterLevelAdapter {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base().to_string(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl FetchAdapter for WaterLevelAdapter {
    fn declaration(&self) -> ToolDeclaration {
        crate::tool_declaration! {
            name: "get_water_levels",
            description: "Current river and sluice-gate water levels with their alert status. \
                          Optionally filter by region or city name.",
            parameters: [
                {
                    name: "region",
                    type: "string",
                    description: "Region or city to filter by, e.g. 'Jakarta'",
                    required: false
                }
            ]
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError> {
        let args: WaterLevelArgs = args.parse()?;
        let query: Vec<(&str, String)> = args
            .region
            .filter(|r| !r.trim().is_empty())
            .map(|r| vec![("region", r)])
            .unwrap_or_default();

        let url = format!("{}/water-levels", self.base_url);
        let readings: Vec<WaterLevelReading> = get_json(&self.client, &url, &query).await?;

        tracing::debug!("Fetched {} water level readings", readings.len());
        to_payload(&readings)
    }
}
