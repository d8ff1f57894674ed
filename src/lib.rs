//! Floodwatch - tool-calling assistant for flood and disaster conditions
//!
//! A language model answers questions about water levels, pump status,
//! earthquakes, crowd reports and weather by calling a fixed catalog of
//! data-fetch tools until it can compose a grounded answer.

pub mod agent;
pub mod config;
pub mod conversation;
pub mod core;
pub mod error;
pub mod tools;
pub mod utils;

pub mod api;
pub mod cli;

pub use agent::{ChatReply, LoopOutcome, ToolTraceEntry};
pub use api::*;
pub use config::{Credentials, Settings};
pub use conversation::{Role, Turn};
pub use error::{FailureReason, ServiceError};
pub use tools::adapters::notification::{Alert, AlertQueue, Severity};

use crate::agent::Orchestrator;
use crate::core::llm::LLMClient;
use crate::tools::catalog::ToolCatalog;
use crate::tools::dispatcher::ToolDispatcher;
use crate::tools::ToolConfig;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static SYSTEM: OnceCell<System> = OnceCell::new();

enum ServiceState {
    Ready(Orchestrator),
    /// Chat is refused up front until the credentials are provided
    Unconfigured { missing: Vec<String> },
}

pub struct System {
    state: ServiceState,
    catalog: Arc<ToolCatalog>,
    alerts: AlertQueue,
}

impl System {
    /// Wire catalog, dispatcher and model client from explicit inputs
    pub fn build(settings: Settings, credentials: Credentials) -> anyhow::Result<Self> {
        let alerts = AlertQueue::new();
        let catalog = Arc::new(ToolCatalog::with_defaults(
            &settings,
            &credentials,
            alerts.clone(),
        )?);

        let missing = credentials.missing();
        let state = match credentials.model_api_key {
            Some(api_key) if missing.is_empty() => {
                let model = Arc::new(LLMClient::new(api_key, &settings));
                let dispatcher =
                    ToolDispatcher::new(Arc::clone(&catalog), ToolConfig::from_settings(&settings));
                ServiceState::Ready(Orchestrator::new(model, dispatcher, settings.agent.clone()))
            }
            _ => {
                tracing::error!(
                    "Missing credentials: {}. Chat requests will be rejected until they are set",
                    missing.join(", ")
                );
                ServiceState::Unconfigured { missing }
            }
        };

        tracing::info!(
            "Tool catalog v{} ready with {} tools",
            catalog.version(),
            catalog.len()
        );

        Ok(Self {
            state,
            catalog,
            alerts,
        })
    }

    fn global() -> anyhow::Result<&'static System> {
        SYSTEM
            .get()
            .ok_or_else(|| anyhow::anyhow!("System not initialized. Call init() first"))
    }

    /// Handle one message on top of prior history
    pub async fn chat(
        &self,
        history: Vec<Turn>,
        message: impl Into<String>,
    ) -> Result<ChatReply, ServiceError> {
        match &self.state {
            ServiceState::Ready(orchestrator) => orchestrator.run(history, message).await,
            ServiceState::Unconfigured { missing } => Err(ServiceError::NotConfigured {
                missing: missing.clone(),
            }),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, ServiceState::Ready(_))
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn alerts(&self) -> &AlertQueue {
        &self.alerts
    }
}

/// Initialize the system from `config/` and the environment
/// Must be called before using any API functions
pub async fn init() -> anyhow::Result<()> {
    init_with_settings(Settings::new()?).await
}

/// Initialize the system with already-loaded settings
pub async fn init_with_settings(settings: Settings) -> anyhow::Result<()> {
    let system = System::build(settings, Credentials::from_env())?;
    SYSTEM
        .set(system)
        .map_err(|_| anyhow::anyhow!("System already initialized"))?;

    tracing::info!("Floodwatch system initialized");
    Ok(())
}

/// Shutdown the system, reporting alerts nobody displayed
pub async fn shutdown() -> anyhow::Result<()> {
    if let Some(system) = SYSTEM.get() {
        let undelivered = system.alerts.drain().await;
        if !undelivered.is_empty() {
            tracing::warn!("Dropping {} undelivered alert(s)", undelivered.len());
        }
    }
    tracing::info!("Floodwatch system shutdown complete");
    Ok(())
}
