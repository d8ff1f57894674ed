//! Model Client Adapter
//!
//! One request/response exchange with an OpenAI-compatible chat-completions
//! backend. The whole conversation and the tool catalog go out; either a
//! final answer or a batch of tool calls comes back. No retries here: the
//! orchestration loop decides whether to try again.

use crate::config::Settings;
use crate::conversation::{ToolCallRequest, Turn, TurnContent};
use crate::error::ModelError;
use crate::tools::catalog::ToolCatalog;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::timeout;

/// What the model wants to do next
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    FinalAnswer(String),
    ToolCallBatch(Vec<ToolCallRequest>),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn exchange(&self, turns: &[Turn], catalog: &ToolCatalog) -> Result<ModelReply, ModelError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

pub struct LLMClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    system_prompt: String,
    timeout: Duration,
}

impl LLMClient {
    pub fn new(api_key: String, settings: &Settings) -> Self {
        let llm = &settings.llm;
        Self {
            client: Client::new(),
            api_key,
            model: llm.model.clone(),
            endpoint: format!("{}/chat/completions", llm.base_url.trim_end_matches('/')),
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            system_prompt: llm.system_prompt.clone(),
            timeout: Duration::from_millis(llm.timeout_ms),
        }
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ModelError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| ModelError::Unreachable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("[LLMClient] API returned error status {}", status);
            return Err(ModelError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ModelError::Unreachable(e.without_url().to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ModelError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl ModelClient for LLMClient {
    async fn exchange(&self, turns: &[Turn], catalog: &ToolCatalog) -> Result<ModelReply, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages: to_messages(&self.system_prompt, turns),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            tools: catalog.to_function_tools(),
            tool_choice: if catalog.is_empty() { None } else { Some("auto") },
        };

        tracing::debug!(
            "[LLMClient] Sending {} messages with {} tools",
            request.messages.len(),
            request.tools.len()
        );

        let response = timeout(self.timeout, self.send(&request))
            .await
            .map_err(|_| ModelError::Timeout(self.timeout.as_millis() as u64))??;

        into_reply(response)
    }
}

fn to_messages(system_prompt: &str, turns: &[Turn]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::text("system", system_prompt));
    }

    for turn in turns {
        match &turn.content {
            TurnContent::Text { text } => {
                let role = match turn.role {
                    crate::conversation::Role::User => "user",
                    _ => "assistant",
                };
                messages.push(ChatMessage::text(role, text));
            }
            TurnContent::ToolCalls { calls } => messages.push(ChatMessage {
                role: "assistant",
                content: None,
                tool_calls: Some(
                    calls
                        .iter()
                        .map(|call| WireToolCall {
                            id: call.id.clone(),
                            call_type: function_type(),
                            function: WireFunction {
                                name: call.name.clone(),
                                arguments: call.arguments.to_string(),
                            },
                        })
                        .collect(),
                ),
                tool_call_id: None,
            }),
            TurnContent::ToolResults { results } => {
                for result in results {
                    messages.push(ChatMessage {
                        role: "tool",
                        content: Some(result.to_model_content()),
                        tool_calls: None,
                        tool_call_id: Some(result.call_id.clone()),
                    });
                }
            }
        }
    }

    messages
}

fn into_reply(response: ChatResponse) -> Result<ModelReply, ModelError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ModelError::Malformed("response has no choices".to_string()))?;

    let wire_calls = message.tool_calls.unwrap_or_default();
    if !wire_calls.is_empty() {
        let mut calls: Vec<ToolCallRequest> = wire_calls
            .into_iter()
            .map(|call| ToolCallRequest {
                id: call.id,
                name: call.function.name,
                arguments: parse_arguments(call.function.arguments),
            })
            .collect();
        normalize_call_ids(&mut calls);
        return Ok(ModelReply::ToolCallBatch(calls));
    }

    match message.content {
        Some(text) if !text.trim().is_empty() => Ok(ModelReply::FinalAnswer(text)),
        _ => Err(ModelError::Malformed(
            "response has neither text nor tool calls".to_string(),
        )),
    }
}

/// Keep unparseable arguments as a raw string so validation can reject them
fn parse_arguments(raw: String) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

/// Call ids must be present and unique within a batch
fn normalize_call_ids(calls: &mut [ToolCallRequest]) {
    let mut seen = HashSet::new();
    for (i, call) in calls.iter_mut().enumerate() {
        if call.id.trim().is_empty() || seen.contains(&call.id) {
            let mut n = i;
            while seen.contains(&format!("call_{}", n)) {
                n += 1;
            }
            call.id = format!("call_{}", n);
        }
        seen.insert(call.id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ToolCallResult;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> LLMClient {
        let mut settings = Settings::default();
        settings.llm.base_url = base_url.to_string();
        settings.llm.timeout_ms = 2_000;
        LLMClient::new("sk-test".to_string(), &settings)
    }

    fn empty_catalog() -> ToolCatalog {
        ToolCatalog::builder().build().unwrap()
    }

    async fn server_replying(body: Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_final_answer() {
        let server = server_replying(json!({
            "choices": [{ "message": { "role": "assistant", "content": "No flooding reported." } }]
        }))
        .await;

        let reply = client(&server.uri())
            .exchange(&[Turn::user("flood?")], &empty_catalog())
            .await
            .unwrap();
        assert_eq!(reply, ModelReply::FinalAnswer("No flooding reported.".to_string()));
    }

    #[tokio::test]
    async fn test_tool_call_batch() {
        let server = server_replying(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        { "id": "call_a", "type": "function",
                          "function": { "name": "geocode_location", "arguments": "{\"place\":\"Jakarta\"}" } },
                        { "id": "call_a", "type": "function",
                          "function": { "name": "get_latest_earthquake", "arguments": "" } },
                        { "id": "call_c", "type": "function",
                          "function": { "name": "get_weather", "arguments": "lat=1" } }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .await;

        let reply = client(&server.uri())
            .exchange(&[Turn::user("flood?")], &empty_catalog())
            .await
            .unwrap();

        let ModelReply::ToolCallBatch(calls) = reply else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, json!({"place": "Jakarta"}));
        assert_eq!(calls[1].id, "call_1");
        assert_eq!(calls[1].arguments, Value::Null);
        assert_eq!(calls[2].arguments, Value::String("lat=1".to_string()));
    }

    #[tokio::test]
    async fn test_request_carries_history_and_tools() {
        let server = server_replying(json!({
            "choices": [{ "message": { "content": "done" } }]
        }))
        .await;

        let catalog = ToolCatalog::builder()
            .register(std::sync::Arc::new(
                crate::tools::adapters::notification::NotificationAdapter::new(
                    crate::tools::adapters::notification::AlertQueue::new(),
                    &Settings::default().providers.notification,
                ),
            ))
            .build()
            .unwrap();
        let turns = vec![
            Turn::user("alert me"),
            Turn::tool_calls(vec![ToolCallRequest::new(
                "c1",
                "send_notification",
                json!({"message": "hi"}),
            )]),
            Turn::tool_results(vec![ToolCallResult::success("c1", "send_notification", json!({"queued": true}))]),
        ];

        client(&server.uri()).exchange(&turns, &catalog).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["tool_calls"][0]["function"]["name"], "send_notification");
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "c1");
        assert_eq!(body["tools"][0]["function"]["name"], "send_notification");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .exchange(&[Turn::user("hi")], &empty_catalog())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Status(500)));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let server = server_replying(json!({ "choices": [] })).await;
        let err = client(&server.uri())
            .exchange(&[Turn::user("hi")], &empty_catalog())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let err = client("http://127.0.0.1:9")
            .exchange(&[Turn::user("hi")], &empty_catalog())
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Unreachable(_)));
    }

    #[test]
    fn test_normalize_call_ids() {
        let mut calls = vec![
            ToolCallRequest::new("", "a", Value::Null),
            ToolCallRequest::new("call_0", "b", Value::Null),
            ToolCallRequest::new("x", "c", Value::Null),
            ToolCallRequest::new("x", "d", Value::Null),
        ];
        normalize_call_ids(&mut calls);
        let ids: Vec<_> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["call_0", "call_1", "x", "call_3"]);
    }
}
