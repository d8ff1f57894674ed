//! Tool System - callable data-fetch operations offered to the model
//!
//! Information Hiding:
//! - Upstream protocols hidden behind the `FetchAdapter` trait
//! - Argument schemas declared once and validated centrally
//! - Retry, timeout and fan-out policy owned by the dispatcher

pub mod adapters;
pub mod catalog;
pub mod dispatcher;
pub mod macros;
pub mod schema;

use crate::config::Settings;
use crate::error::AdapterError;
use async_trait::async_trait;
use schema::ValidatedArgs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// One argument of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: String,
    pub description: String,
    pub required: bool,
    /// Restricts a string parameter to a fixed set of values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

/// Name, description and argument schema of a callable operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl fmt::Display for ToolDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Fetch Adapter - the implementation behind one tool
///
/// Adapters receive arguments that already passed schema validation and
/// return a serialized domain DTO. They must not retry or time themselves
/// out; the dispatcher owns both.
#[async_trait]
pub trait FetchAdapter: Send + Sync {
    fn declaration(&self) -> ToolDeclaration;

    /// Upper bound for one attempt
    fn timeout(&self) -> Duration;

    async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError>;
}

/// Dispatch policy shared by every tool call
#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub max_retries: u32,
    pub max_concurrency: usize,
}

impl ToolConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.tools.max_retries,
            max_concurrency: settings.agent.max_concurrency.max(1),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            max_concurrency: 6,
        }
    }
}
