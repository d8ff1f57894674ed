//! Fetch Adapters - one per external data domain
//!
//! Information Hiding:
//! - Upstream URL layout and wire formats hidden per adapter
//! - Upstream payloads converted into small domain DTOs
//! - Failures reported as `AdapterError`, never as empty data

pub mod crowd_report;
pub mod geocode;
pub mod notification;
pub mod pump;
pub mod seismic;
pub mod water_level;
pub mod weather;

use crate::error::AdapterError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// GET a JSON document; non-2xx and undecodable bodies are errors
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T, AdapterError> {
    tracing::debug!("GET {}", url);

    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::Status(status.as_u16()));
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| AdapterError::Decode(e.to_string()))
}

pub(crate) fn to_payload<T: Serialize>(dto: &T) -> Result<Value, AdapterError> {
    serde_json::to_value(dto).map_err(|e| AdapterError::Decode(e.to_string()))
}
