//! Error taxonomy
//!
//! Tool-local errors (`ToolErrorKind`) never abort the loop: they are encoded
//! into tool turns and handed back to the model. Loop-level failures
//! (`FailureReason`) end a request with a fallback answer. `ServiceError` is
//! the only thing a caller ever sees as an `Err`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of a failed tool call, as reported to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    UpstreamFailure,
    Timeout,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::InvalidArguments => "invalid_arguments",
            ToolErrorKind::UpstreamFailure => "upstream_failure",
            ToolErrorKind::Timeout => "timeout",
        }
    }

    /// Only transient failures are worth a second attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolErrorKind::UpstreamFailure | ToolErrorKind::Timeout)
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error carried by a failed `ToolCallResult`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            adapter: None,
        }
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }
}

/// Failure raised by a Fetch Adapter
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("malformed upstream payload: {0}")]
    Decode(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("adapter not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(e: reqwest::Error) -> Self {
        // Drop the URL so query-string credentials never reach the message
        let e = e.without_url();
        if e.is_decode() {
            AdapterError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            AdapterError::Status(status.as_u16())
        } else {
            AdapterError::Network(e.to_string())
        }
    }
}

/// Failure of a single model exchange
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model backend unreachable: {0}")]
    Unreachable(String),

    #[error("model backend returned HTTP {0}")]
    Status(u16),

    #[error("model exchange timed out after {0}ms")]
    Timeout(u64),

    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Problems detected while building the Tool Catalog
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("tool '{0}' is declared more than once")]
    DuplicateTool(String),

    #[error("tool '{tool}' has an invalid schema: {reason}")]
    InvalidSchema { tool: String, reason: String },
}

/// History handed in by a caller that breaks the conversation invariants
#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("turn {index}: {role} turn cannot carry this content")]
    RoleMismatch { index: usize, role: String },

    #[error("turn {index}: tool turn does not follow a model turn requesting tools")]
    OrphanToolTurn { index: usize },

    #[error("turn {index}: expected {expected} tool results, found {found}")]
    ResultCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("turn {index}: result for call '{call_id}' does not match its request")]
    CallIdMismatch { index: usize, call_id: String },

    #[error("turn {index}: tool requests were never answered")]
    UnansweredToolCalls { index: usize },
}

/// Loop-level reasons a conversation turn ended in the `failed` state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    ModelUnavailable,
    MaxIterationsExceeded,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ModelUnavailable => f.write_str("model_unavailable"),
            FailureReason::MaxIterationsExceeded => f.write_str("max_iterations_exceeded"),
        }
    }
}

/// Errors returned to callers of the chat facade
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service is not configured: missing {}", missing.join(", "))]
    NotConfigured { missing: Vec<String> },

    #[error("invalid conversation history: {0}")]
    InvalidHistory(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ToolErrorKind::UpstreamFailure.is_retryable());
        assert!(ToolErrorKind::Timeout.is_retryable());
        assert!(!ToolErrorKind::UnknownTool.is_retryable());
        assert!(!ToolErrorKind::InvalidArguments.is_retryable());
    }

    #[test]
    fn test_tool_error_serializes_snake_case() {
        let error = ToolError::new(ToolErrorKind::UnknownTool, "no such tool").with_adapter("x");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["kind"], "unknown_tool");
        assert_eq!(value["adapter"], "x");
    }

    #[test]
    fn test_not_configured_lists_missing_credentials() {
        let error = ServiceError::NotConfigured {
            missing: vec!["OPENAI_API_KEY".to_string(), "OPENWEATHER_API_KEY".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "service is not configured: missing OPENAI_API_KEY, OPENWEATHER_API_KEY"
        );
    }
}
