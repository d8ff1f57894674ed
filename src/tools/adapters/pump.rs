//! Flood pump station status from the flood-monitoring gateway

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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpStatus {
    On,
    Off,
    Maintenance,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpState {
    pub station: String,
    #[serde(default)]
    pub location: Option<String>,
    pub status: PumpStatus,
    #[serde(default)]
    pub pumps_active: Option<u32>,
    #[serde(default)]
    pub pumps_total: Option<u32>,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
struct PumpArgs {
    station: Option<String>,
}

pub struct PumpStatusAdapter {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl PumpStatusAdapter {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base().to_string(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl FetchAdapter for PumpStatusAdapter {
    fn declaration(&self) -> ToolDeclaration {
        crate::tool_declaration! {
            name: "get_pump_status",
            description: "Operating status of flood pump stations. Optionally filter by station name.",
            parameters: [
                {
                    name: "station",
                    type: "string",
                    description: "Pump station name, e.g. 'Pluit'",
                    required: false
                }
            ]
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError> {
        let args: PumpArgs = args.parse()?;
        let query: Vec<(&str, String)> = args
            .station
            .filter(|s| !s.trim().is_empty())
            .map(|s| vec![("station", s)])
            .unwrap_or_default();

        let url = format!("{}/pumps", self.base_url);
        let pumps: Vec<PumpState> = get_json(&self.client, &url, &query).await?;

        let offline = pumps.iter().filter(|p| p.status != PumpStatus::On).count();
        tracing::debug!("Fetched {} pump stations ({} not running)", pumps.len(), offline);
        to_payload(&pumps)
    }
}
