//! Crowd-sourced disaster reports from the PetaBencana API

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

const DEFAULT_WINDOW_HOURS: i64 = 24;
const MAX_WINDOW_HOURS: i64 = 168;

/// Province names (Indonesian and English) to admin codes
const REGIONS: &[(&str, &str)] = &[
    ("jakarta", "ID-JK"),
    ("dki jakarta", "ID-JK"),
    ("jawa barat", "ID-JB"),
    ("west java", "ID-JB"),
    ("banten", "ID-BT"),
    ("jawa tengah", "ID-JT"),
    ("central java", "ID-JT"),
    ("jawa timur", "ID-JI"),
    ("east java", "ID-JI"),
    ("yogyakarta", "ID-YO"),
    ("jogja", "ID-YO"),
    ("bali", "ID-BA"),
    ("aceh", "ID-AC"),
    ("sumatera utara", "ID-SU"),
    ("north sumatra", "ID-SU"),
    ("sumatera barat", "ID-SB"),
    ("west sumatra", "ID-SB"),
    ("sulawesi selatan", "ID-SN"),
    ("south sulawesi", "ID-SN"),
    ("kalimantan timur", "ID-KI"),
    ("east kalimantan", "ID-KI"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrowdReport {
    pub id: String,
    pub created_at: String,
    pub disaster_type: String,
    pub text: Option<String>,
    pub source: Option<String>,
    pub flood_depth_cm: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrowdReportArgs {
    region: String,
    window_hours: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ReportsResponse {
    result: Option<FeatureCollection>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    pkey: Value,
    created_at: String,
    disaster_type: Option<String>,
    text: Option<String>,
    source: Option<String>,
    url: Option<String>,
    report_data: Option<ReportData>,
}

#[derive(Debug, Deserialize)]
struct ReportData {
    flood_depth: Option<f64>,
}

impl From<Feature> for CrowdReport {
    fn from(feature: Feature) -> Self {
        let props = feature.properties;
        // GeoJSON order is [lon, lat]
        let (longitude, latitude) = match feature.geometry.as_ref().map(|g| g.coordinates.as_slice()) {
            Some([lon, lat, ..]) => (Some(*lon), Some(*lat)),
            _ => (None, None),
        };
        let id = match props.pkey {
            Value::String(s) => s,
            other => other.to_string(),
        };

        CrowdReport {
            id,
            created_at: props.created_at,
            disaster_type: props.disaster_type.unwrap_or_else(|| "unknown".to_string()),
            text: props.text.filter(|t| !t.trim().is_empty()),
            source: props.source,
            flood_depth_cm: props.report_data.and_then(|d| d.flood_depth),
            latitude,
            longitude,
            url: props.url,
        }
    }
}

/// Resolve a region name or raw `ID-XX` code
pub fn admin_code(region: &str) -> Option<String> {
    let normalized = region.trim().to_lowercase();
    if normalized.len() == 5
        && normalized.starts_with("id-")
        && normalized[3..].chars().all(|c| c.is_ascii_alphabetic())
    {
        return Some(normalized.to_uppercase());
    }

    // Aliases match whole words only: "Balikpapan" is not "bali"
    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    REGIONS
        .iter()
        .find(|(name, _)| {
            let alias: Vec<&str> = name.split(' ').collect();
            words.windows(alias.len()).any(|window| window == alias.as_slice())
        })
        .map(|(_, code)| code.to_string())
}

pub struct CrowdReportAdapter {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl CrowdReportAdapter {
    pub fn new(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base().to_string(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl FetchAdapter for CrowdReportAdapter {
    fn declaration(&self) -> ToolDeclaration {
        crate::tool_declaration! {
            name: "get_flood_reports",
            description: "Crowd-sourced flood and disaster reports submitted by residents in a \
                          province over a recent time window.",
            parameters: [
                {
                    name: "region",
                    type: "string",
                    description: "Province name (e.g. 'Jakarta', 'Jawa Barat') or code like 'ID-JK'",
                    required: true
                },
                {
                    name: "window_hours",
                    type: "integer",
                    description: "How many hours back to look, 1 to 168 (default 24)",
                    required: false
                }
            ]
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError> {
        let args: CrowdReportArgs = args.parse()?;

        let code = admin_code(&args.region).ok_or_else(|| {
            AdapterError::InvalidInput(format!("unknown region '{}'", args.region))
        })?;
        let hours = args.window_hours.unwrap_or(DEFAULT_WINDOW_HOURS);
        if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
            return Err(AdapterError::InvalidInput(format!(
                "window_hours must be between 1 and {}, got {}",
                MAX_WINDOW_HOURS, hours
            )));
        }

        let url = format!("{}/reports", self.base_url);
        let query = [
            ("admin", code.clone()),
            ("timeperiod", (hours * 3600).to_string()),
            ("geoformat", "geojson".to_string()),
        ];
        let response: ReportsResponse = get_json(&self.client, &url, &query).await?;

        let reports: Vec<CrowdReport> = response
            .result
            .map(|r| r.features)
            .unwrap_or_default()
            .into_iter()
            .map(CrowdReport::from)
            .collect();

        tracing::debug!("Fetched {} reports for {} over {}h", reports.len(), code, hours);
        to_payload(&reports)
    }
}
