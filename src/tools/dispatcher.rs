//! Tool Dispatcher with Retry Logic
//!
//! Information Hiding:
//! - Lookup, validation and adapter invocation folded into one call
//! - Retry and timeout policy hidden
//! - Error classification and message sanitizing hidden
//!
//! Every request yields exactly one `ToolCallResult`; nothing escapes as an
//! `Err` or a panic.

use super::catalog::ToolCatalog;
use super::schema;
use super::ToolConfig;
use crate::conversation::{ToolCallRequest, ToolCallResult};
use crate::error::{AdapterError, ToolError, ToolErrorKind};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

const MAX_ERROR_CHARS: usize = 240;

static SECRET_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(appid|api_key|apikey|key|token|access_token)=[^&\s]+")
        .expect("secret pattern is valid")
});

/// Outcome of one dispatched call plus bookkeeping for the trace
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub result: ToolCallResult,
    pub attempts: u32,
    pub duration: Duration,
}

pub struct ToolDispatcher {
    catalog: Arc<ToolCatalog>,
    config: ToolConfig,
}

impl ToolDispatcher {
    pub fn new(catalog: Arc<ToolCatalog>, config: ToolConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Run a batch concurrently, at most `max_concurrency` at a time.
    ///
    /// Calls are isolated: a failing or slow call only costs its own timeout
    /// budget and holds one slot. Results come back in request order.
    pub async fn dispatch_batch(&self, calls: &[ToolCallRequest]) -> Vec<DispatchRecord> {
        tracing::info!(
            "Dispatching {} tool call(s) (concurrency {})",
            calls.len(),
            self.config.max_concurrency
        );

        // Completes out of order; sorted back by index below
        let mut indexed: Vec<(usize, DispatchRecord)> = stream::iter(calls.iter().enumerate())
            .map(|(index, call)| async move { (index, self.dispatch(call).await) })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, record)| record).collect()
    }

    /// Execute a single request against the catalog
    pub async fn dispatch(&self, call: &ToolCallRequest) -> DispatchRecord {
        let start = Instant::now();
        let (result, attempts) = self.run(call).await;
        let duration = start.elapsed();

        match result.error() {
            None => tracing::debug!("Tool '{}' ({}) succeeded in {:?}", call.name, call.id, duration),
            Some(e) => tracing::warn!("Tool '{}' ({}) failed: {}", call.name, call.id, e),
        }

        DispatchRecord {
            result,
            attempts,
            duration,
        }
    }

    async fn run(&self, call: &ToolCallRequest) -> (ToolCallResult, u32) {
        let fail = |error: ToolError| ToolCallResult::failure(&call.id, &call.name, error);

        let Some((declaration, adapter)) = self.catalog.lookup(&call.name) else {
            let error = ToolError::new(
                ToolErrorKind::UnknownTool,
                format!(
                    "no tool named '{}'; available tools: {}",
                    call.name,
                    self.catalog.tool_names().join(", ")
                ),
            );
            return (fail(error), 0);
        };

        let args = match schema::validate(declaration, &call.arguments) {
            Ok(args) => args,
            Err(problems) => {
                let error = ToolError::new(ToolErrorKind::InvalidArguments, problems);
                return (fail(error), 0);
            }
        };

        let budget = adapter.timeout();
        let max_attempts = self.config.max_retries + 1;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tracing::warn!(
                    "Retrying tool '{}' (attempt {}/{})",
                    call.name,
                    attempt,
                    max_attempts
                );
            }

            let error = match timeout(budget, adapter.fetch(args.clone())).await {
                Ok(Ok(payload)) => {
                    return (ToolCallResult::success(&call.id, &call.name, payload), attempt);
                }
                Ok(Err(AdapterError::InvalidInput(message))) => {
                    ToolError::new(ToolErrorKind::InvalidArguments, sanitize(&message))
                }
                Ok(Err(e)) => ToolError::new(ToolErrorKind::UpstreamFailure, sanitize(&e.to_string()))
                    .with_adapter(&declaration.name),
                Err(_) => ToolError::new(
                    ToolErrorKind::Timeout,
                    format!("no response within {}ms", budget.as_millis()),
                )
                .with_adapter(&declaration.name),
            };

            if !error.kind.is_retryable() {
                return (fail(error), attempt);
            }
            last_error = Some(error);
        }

        let error = last_error.unwrap_or_else(|| {
            ToolError::new(ToolErrorKind::UpstreamFailure, "no attempt was made")
                .with_adapter(&declaration.name)
        });
        (fail(error), max_attempts)
    }
}

/// Strip credentials and cap length before a message reaches the model
fn sanitize(message: &str) -> String {
    let redacted = SECRET_PARAM.replace_all(message, "$1=[redacted]");
    if redacted.chars().count() > MAX_ERROR_CHARS {
        let mut short: String = redacted.chars().take(MAX_ERROR_CHARS).collect();
        short.push_str("...");
        short
    } else {
        redacted.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::ValidatedArgs;
    use crate::tools::{FetchAdapter, ToolDeclaration};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted adapter: fails the first `failures` calls, sleeps `delay` each call
    struct MockAdapter {
        name: String,
        delay: Duration,
        timeout: Duration,
        failures: u32,
        calls: AtomicU32,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        starts: Mutex<Vec<Instant>>,
    }

    impl MockAdapter {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                delay: Duration::ZERO,
                timeout: Duration::from_secs(2),
                failures: 0,
                calls: AtomicU32::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                starts: Mutex::new(Vec::new()),
            }
        }

        fn delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }

        fn failures(mut self, failures: u32) -> Self {
            self.failures = failures;
            self
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FetchAdapter for MockAdapter {
        fn declaration(&self) -> ToolDeclaration {
            crate::tool_declaration! {
                name: self.name,
                description: "mock",
                parameters: [
                    { name: "region", type: "string", description: "Region", required: false }
                ]
            }
        }

        fn timeout(&self) -> Duration {
            self.timeout
        }

        async fn fetch(&self, args: ValidatedArgs) -> Result<Value, AdapterError> {
            self.starts.lock().unwrap().push(Instant::now());
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if args.parse::<Value>()?["region"] == "Atlantis" {
                return Err(AdapterError::InvalidInput("unknown region 'Atlantis'".to_string()));
            }
            if call <= self.failures {
                return Err(AdapterError::Status(502));
            }
            Ok(json!({ "source": self.name }))
        }
    }

    fn dispatcher(adapters: Vec<Arc<MockAdapter>>) -> ToolDispatcher {
        let mut builder = ToolCatalog::builder();
        for adapter in adapters {
            builder = builder.register(adapter);
        }
        ToolDispatcher::new(Arc::new(builder.build().unwrap()), ToolConfig::default())
    }

    fn call(id: &str, name: &str, args: Value) -> ToolCallRequest {
        ToolCallRequest::new(id, name, args)
    }

    #[tokio::test]
    async fn test_unknown_tool_is_structured_error() {
        let dispatcher = dispatcher(vec![Arc::new(MockAdapter::new("get_weather"))]);
        let record = dispatcher.dispatch(&call("1", "get_tsunami", json!({}))).await;

        let error = record.result.error().unwrap();
        assert_eq!(error.kind, ToolErrorKind::UnknownTool);
        assert!(error.message.contains("get_tsunami"));
        assert!(error.message.contains("get_weather"));
        assert_eq!(record.attempts, 0);
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_adapter() {
        let adapter = Arc::new(MockAdapter::new("get_water_levels"));
        let dispatcher = dispatcher(vec![adapter.clone()]);

        let record = dispatcher
            .dispatch(&call("1", "get_water_levels", json!({"region": 7})))
            .await;

        let error = record.result.error().unwrap();
        assert_eq!(error.kind, ToolErrorKind::InvalidArguments);
        assert!(error.message.contains("region"));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn test_adapter_input_rejection_is_not_retried() {
        let adapter = Arc::new(MockAdapter::new("get_water_levels"));
        let dispatcher = dispatcher(vec![adapter.clone()]);

        let record = dispatcher
            .dispatch(&call("1", "get_water_levels", json!({"region": "Atlantis"})))
            .await;

        assert_eq!(record.result.error().unwrap().kind, ToolErrorKind::InvalidArguments);
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn test_single_retry_recovers() {
        let adapter = Arc::new(MockAdapter::new("get_pump_status").failures(1));
        let dispatcher = dispatcher(vec![adapter.clone()]);

        let record = dispatcher.dispatch(&call("1", "get_pump_status", json!({}))).await;

        assert!(record.result.is_success());
        assert_eq!(record.attempts, 2);
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn test_two_failures_give_upstream_failure() {
        let adapter = Arc::new(MockAdapter::new("get_pump_status").failures(5));
        let dispatcher = dispatcher(vec![adapter.clone()]);

        let record = dispatcher.dispatch(&call("1", "get_pump_status", json!({}))).await;

        let error = record.result.error().unwrap();
        assert_eq!(error.kind, ToolErrorKind::UpstreamFailure);
        assert_eq!(error.adapter.as_deref(), Some("get_pump_status"));
        assert_eq!(adapter.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_does_not_hold_back_siblings() {
        let weather = Arc::new(
            MockAdapter::new("get_weather")
                .delay(Duration::from_millis(500))
                .timeout(Duration::from_millis(40)),
        );
        let quake = Arc::new(MockAdapter::new("get_latest_earthquake"));
        let dispatcher = dispatcher(vec![weather.clone(), quake.clone()]);

        let records = dispatcher
            .dispatch_batch(&[
                call("w", "get_weather", json!({})),
                call("q", "get_latest_earthquake", json!({})),
            ])
            .await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].result.call_id, "w");
        assert_eq!(records[0].result.error().unwrap().kind, ToolErrorKind::Timeout);
        assert_eq!(weather.calls(), 2);

        assert_eq!(records[1].result.call_id, "q");
        assert!(records[1].result.is_success());
        assert!(records[1].duration < Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_batch_preserves_request_order() {
        let slow = Arc::new(MockAdapter::new("slow").delay(Duration::from_millis(60)));
        let medium = Arc::new(MockAdapter::new("medium").delay(Duration::from_millis(30)));
        let fast = Arc::new(MockAdapter::new("fast"));
        let dispatcher = dispatcher(vec![slow, medium, fast]);

        let calls = vec![
            call("0", "slow", json!({})),
            call("1", "fast", json!({})),
            call("2", "nope", json!({})),
            call("3", "medium", json!({})),
            call("4", "fast", json!({"region": 1})),
        ];
        let records = dispatcher.dispatch_batch(&calls).await;

        let ids: Vec<_> = records.iter().map(|r| r.result.call_id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
        assert!(records[0].result.is_success());
        assert_eq!(records[2].result.error().unwrap().kind, ToolErrorKind::UnknownTool);
        assert_eq!(records[4].result.error().unwrap().kind, ToolErrorKind::InvalidArguments);
    }

    #[tokio::test]
    async fn test_slow_call_does_not_delay_later_calls() {
        let slow = Arc::new(MockAdapter::new("get_flood_reports").delay(Duration::from_millis(400)));
        let fast = Arc::new(MockAdapter::new("get_water_levels"));
        let dispatcher = dispatcher(vec![slow.clone(), fast.clone()]);

        let mut calls = vec![call("slow", "get_flood_reports", json!({}))];
        calls.extend((0..7).map(|i| call(&format!("fast{}", i), "get_water_levels", json!({}))));

        let begin = Instant::now();
        let records = dispatcher.dispatch_batch(&calls).await;

        let starts = fast.starts.lock().unwrap().clone();
        assert_eq!(starts.len(), 7);
        for start in starts {
            let offset = start.duration_since(begin);
            assert!(offset < Duration::from_millis(150), "fast call started after {:?}", offset);
        }

        let ids: Vec<_> = records.iter().map(|r| r.result.call_id.as_str()).collect();
        assert_eq!(ids[0], "slow");
        assert_eq!(ids[1..], ["fast0", "fast1", "fast2", "fast3", "fast4", "fast5", "fast6"]);
        assert!(records.iter().all(|r| r.result.is_success()));
    }

    #[tokio::test]
    async fn test_batch_concurrency_is_bounded() {
        let adapter = Arc::new(MockAdapter::new("get_water_levels").delay(Duration::from_millis(20)));
        let catalog = ToolCatalog::builder().register(adapter.clone()).build().unwrap();
        let dispatcher = ToolDispatcher::new(
            Arc::new(catalog),
            ToolConfig {
                max_retries: 1,
                max_concurrency: 3,
            },
        );

        let calls: Vec<_> = (0..10)
            .map(|i| call(&i.to_string(), "get_water_levels", json!({})))
            .collect();
        let records = dispatcher.dispatch_batch(&calls).await;

        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.result.is_success()));
        let peak = adapter.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency was {}", peak);
        assert!(peak > 1);
    }

    #[test]
    fn test_sanitize_redacts_credentials() {
        let message = "error sending request for url (https://api.example.com/weather?lat=1&appid=SECRET123&units=metric)";
        let clean = sanitize(message);
        assert!(!clean.contains("SECRET123"));
        assert!(clean.contains("appid=[redacted]"));

        let long = "x".repeat(1000);
        assert_eq!(sanitize(&long).chars().count(), MAX_ERROR_CHARS + 3);
    }
}
