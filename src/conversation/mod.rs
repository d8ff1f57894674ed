//! Conversation data model
//!
//! A conversation is an ordered list of turns. Order is the model's only
//! memory, so turns are never edited once appended.

pub mod session;

pub use session::ConversationSession;

use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Model => f.write_str("model"),
            Role::Tool => f.write_str("tool"),
        }
    }
}

/// A tool invocation requested by the model. Arguments are untrusted until
/// validated against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success { payload: Value },
    Error(ToolError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub tool: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    pub fn success(call_id: impl Into<String>, tool: impl Into<String>, payload: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool: tool.into(),
            outcome: ToolOutcome::Success { payload },
        }
    }

    pub fn failure(call_id: impl Into<String>, tool: impl Into<String>, error: ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            tool: tool.into(),
            outcome: ToolOutcome::Error(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&ToolError> {
        match &self.outcome {
            ToolOutcome::Error(e) => Some(e),
            ToolOutcome::Success { .. } => None,
        }
    }

    /// JSON body handed back to the model for this call
    pub fn to_model_content(&self) -> String {
        let body = match &self.outcome {
            ToolOutcome::Success { payload } => serde_json::json!({ "ok": true, "data": payload }),
            ToolOutcome::Error(e) => serde_json::json!({ "ok": false, "error": e }),
        };
        body.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    Text { text: String },
    ToolCalls { calls: Vec<ToolCallRequest> },
    ToolResults { results: Vec<ToolCallResult> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: TurnContent,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: TurnContent::Text { text: text.into() },
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Model,
            content: TurnContent::ToolCalls { calls },
        }
    }

    pub fn tool_results(results: Vec<ToolCallResult>) -> Self {
        Self {
            role: Role::Tool,
            content: TurnContent::ToolResults { results },
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn requested_calls(&self) -> Option<&[ToolCallRequest]> {
        match &self.content {
            TurnContent::ToolCalls { calls } => Some(calls),
            _ => None,
        }
    }

    pub fn results(&self) -> Option<&[ToolCallResult]> {
        match &self.content {
            TurnContent::ToolResults { results } => Some(results),
            _ => None,
        }
    }

    /// Whether the role is allowed to carry this kind of content
    pub(crate) fn is_well_formed(&self) -> bool {
        matches!(
            (self.role, &self.content),
            (Role::User, TurnContent::Text { .. })
                | (Role::Model, TurnContent::Text { .. })
                | (Role::Model, TurnContent::ToolCalls { .. })
                | (Role::Tool, TurnContent::ToolResults { .. })
        )
    }
}
