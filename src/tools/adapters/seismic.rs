//! Latest earthquake from the BMKG `autogempa.json` feed
//!
//! The feed reports every number as text ("5.1", "10 km", "-6.12,106.5"),
//! so values are parsed here and a feed that cannot be parsed is an error.

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
pub struct QuakeRecord {
    pub occurred_at: String,
    pub latitude: f64,
    pub longitude: f64,
    pub magnitude: f64,
    pub depth_km: Option<f64>,
    pub region: String,
    pub tsunami_potential: String,
    pub felt: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "Infogempa")]
    info: FeedInfo,
}

#[derive(Debug, Deserialize)]
struct FeedInfo {
    #[serde(rename = "gempa")]
    quake: FeedQuake,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FeedQuake {
    date_time: String,
    coordinates: String,
    magnitude: String,
    kedalaman: Option<String>,
    wilayah: String,
    potensi: Option<String>,
    dirasakan: Option<String>,
}

impl TryFrom<FeedQuake> for QuakeRecord {
    type Error = AdapterError;

    fn try_from(raw: FeedQuake) -> Result<Self, Self::Error> {
        let (latitude, longitude) = raw
            .coordinates
            .split_once(',')
            .and_then(|(lat, lon)| Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?)))
            .ok_or_else(|| AdapterError::Decode(format!("bad coordinates '{}'", raw.coordinates)))?;

        let magnitude = raw
            .magnitude
            .trim()
            .parse()
            .map_err(|_| AdapterError::Decode(format!("bad magnitude '{}'", raw.magnitude)))?;

        let depth_km = raw
            .kedalaman
            .as_deref()
            .and_then(|d| d.split_whitespace().next())
            .and_then(|d| d.parse().ok());

        Ok(QuakeRecord {
            occurred_at: raw.date_time,
            latitude,
            longitude,
            magnitude,
            depth_km,
            region: raw.wilayah,
            tsunami_potential: raw.potensi.unwrap_or_default(),
            felt: raw.dirasakan.filter(|d| !d.trim().is_empty() && d.trim() != "-"),
        })
    }
}

pub struct SeismicAdapter {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl SeismicAdapter {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base().to_string(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl FetchAdapter for SeismicAdapter {
    fn declaration(&self) -> ToolDeclaration {
        crate::tool_declaration! {
            name: "get_latest_earthquake",
            description: "The most recent significant earthquake recorded by BMKG: time, location, \
                          magnitude, depth and tsunami potential.",
            parameters: []
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, _args: ValidatedArgs) -> Result<Value, AdapterError> {
        let url = format!("{}/autogempa.json", self.base_url);
        let feed: Feed = get_json(&self.client, &url, &[]).await?;
        let record = QuakeRecord::try_from(feed.info.quake)?;

        tracing::debug!("Latest quake M{} at {}", record.magnitude, record.region);
        to_payload(&record)
    }
}
