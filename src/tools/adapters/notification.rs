//! UI notification side-channel
//!
//! Goes through the same catalog, validation and dispatch path as the data
//! sources. Its only effect is putting an alert on the shared queue, which the
//! presentation layer drains.

use super::to_payload;
use crate::config::ProviderConfig;
use crate::error::AdapterError;
use crate::tools::schema::ValidatedArgs;
use crate::tools::{FetchAdapter, ToolDeclaration};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Pending alerts kept when the UI is not draining; the oldest go first
pub const MAX_PENDING_ALERTS: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
    pub raised_at_unix: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAck {
    pub queued: bool,
    /// An identical alert was already waiting to be shown
    pub duplicate: bool,
    pub severity: Severity,
}

/// Pending UI alerts, shared between the adapter and the UI
///
/// Enqueue is idempotent: an alert identical to one still pending is not
/// added again. The check and the insert happen under one lock. At most
/// `MAX_PENDING_ALERTS` are held.
#[derive(Debug, Clone, Default)]
pub struct AlertQueue {
    pending: Arc<Mutex<VecDeque<Alert>>>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an identical alert was already pending
    pub async fn enqueue(&self, message: &str, severity: Severity) -> bool {
        let mut pending = self.pending.lock().await;
        if pending
            .iter()
            .any(|a| a.message == message && a.severity == severity)
        {
            return false;
        }

        let raised_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        if pending.len() >= MAX_PENDING_ALERTS {
            if let Some(dropped) = pending.pop_front() {
                tracing::warn!("Alert queue full, dropping oldest alert: {}", dropped.message);
            }
        }
        pending.push_back(Alert {
            message: message.to_string(),
            severity,
            raised_at_unix,
        });
        true
    }

    /// Take every pending alert, oldest first
    pub async fn drain(&self) -> Vec<Alert> {
        self.pending.lock().await.drain(..).collect()
    }
}

#[derive(Debug, Deserialize)]
struct NotificationArgs {
    message: String,
    severity: Option<Severity>,
}

pub struct NotificationAdapter {
    queue: AlertQueue,
    timeout: Duration,
}

impl NotificationAdapter {
    pub fn new(queue: AlertQueue, config: &ProviderConfig) -> Self {
        Self {
            queue,
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl FetchAdapter for NotificationAdapter {
    fn declaration(&self) -> ToolDeclaration {
        crate::tool_declaration! {
            name: "send_notification",
            description: "Show an alert banner to the user, for example when water levels or \
                          reports indicate danger. Returns an acknowledgement only.",
            parameters: [
                {
                    name: "message",
                    type: "string",
                    description: "Short alert text",
                    required: true
                },
                {
                    name: "severity",
                    type: "string",
                    description: "Alert severity (default info)",
                    required: false,
                    allowed: ["info", "warning", "critical"]
                }
            ]
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError> {
        let args: NotificationArgs = args.parse()?;
        let severity = args.severity.unwrap_or_default();
        let message = args.message.trim();
        if message.is_empty() {
            return Err(AdapterError::InvalidInput("message must not be empty".to_string()));
        }

        let queued = self.queue.enqueue(message, severity).await;
        tracing::info!("UI alert ({:?}) queued={}: {}", severity, queued, message);

        to_payload(&NotificationAck {
            queued,
            duplicate: !queued,
            severity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema;
    use serde_json::json;

    fn adapter(queue: AlertQueue) -> NotificationAdapter {
        NotificationAdapter::new(
            queue,
            &ProviderConfig {
                base_url: String::new(),
                timeout_ms: 500,
            },
        )
    }

    #[tokio::test]
    async fn test_enqueue_and_ack() {
        let queue = AlertQueue::new();
        let adapter = adapter(queue.clone());
        let args = schema::validate(
            &adapter.declaration(),
            &json!({"message": "Manggarai at Siaga 1", "severity": "critical"}),
        )
        .unwrap();

        let ack: NotificationAck = serde_json::from_value(adapter.fetch(args).await.unwrap()).unwrap();
        assert!(ack.queued);
        assert!(!ack.duplicate);
        assert_eq!(ack.severity, Severity::Critical);

        let alerts = queue.drain().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].message, "Manggarai at Siaga 1");
        assert!(queue.drain().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_alert_is_not_queued() {
        let queue = AlertQueue::new();
        let adapter = adapter(queue.clone());
        let raw = json!({"message": "Pumps offline in Pluit", "severity": "warning"});

        let first = schema::validate(&adapter.declaration(), &raw).unwrap();
        let first: NotificationAck = serde_json::from_value(adapter.fetch(first).await.unwrap()).unwrap();
        assert!(first.queued);
        assert!(!first.duplicate);

        let second = schema::validate(&adapter.declaration(), &raw).unwrap();
        let second: NotificationAck = serde_json::from_value(adapter.fetch(second).await.unwrap()).unwrap();
        assert!(!second.queued);
        assert!(second.duplicate);

        assert_eq!(queue.drain().await.len(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_oldest() {
        let queue = AlertQueue::new();
        for i in 0..MAX_PENDING_ALERTS + 3 {
            assert!(queue.enqueue(&format!("gauge {} rising", i), Severity::Warning).await);
        }

        let alerts = queue.drain().await;
        assert_eq!(alerts.len(), MAX_PENDING_ALERTS);
        assert_eq!(alerts[0].message, "gauge 3 rising");
        assert_eq!(
            alerts[MAX_PENDING_ALERTS - 1].message,
            format!("gauge {} rising", MAX_PENDING_ALERTS + 2)
        );
    }

    #[tokio::test]
    async fn test_default_severity_is_info() {
        let queue = AlertQueue::new();
        let adapter = adapter(queue.clone());
        let args = schema::validate(&adapter.declaration(), &json!({"message": "FYI"})).unwrap();
        adapter.fetch(args).await.unwrap();
        assert_eq!(queue.drain().await[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_is_idempotent() {
        let queue = AlertQueue::new();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let message = if i % 2 == 0 { "evacuate Kampung Melayu" } else { "pumps offline" };
                    queue.enqueue(message, Severity::Warning).await
                })
            })
            .collect();

        let mut newly_queued = 0;
        for handle in handles {
            if handle.await.unwrap() {
                newly_queued += 1;
            }
        }

        assert_eq!(newly_queued, 2);
        assert_eq!(queue.drain().await.len(), 2);
    }
}
