use crate::conversation::{ToolOutcome, Turn};
use crate::error::{FailureReason, ToolErrorKind};
use crate::tools::dispatcher::DispatchRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Shown to the user when the loop cannot reach a final answer
pub const FALLBACK_ANSWER: &str =
    "I could not complete that request right now. Please try again in a moment.";

/// Terminal state of one chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum LoopOutcome {
    Done,
    Failed(FailureReason),
}

impl LoopOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, LoopOutcome::Done)
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            LoopOutcome::Failed(reason) => Some(*reason),
            LoopOutcome::Done => None,
        }
    }
}

/// One dispatched tool call, for debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolTraceEntry {
    /// 1-based tool round trip
    pub round: usize,
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    /// `None` on success
    pub error: Option<ToolErrorKind>,
    pub attempts: u32,
    pub duration_ms: u64,
}

impl ToolTraceEntry {
    pub(crate) fn new(round: usize, arguments: Value, record: &DispatchRecord) -> Self {
        let error = match &record.result.outcome {
            ToolOutcome::Success { .. } => None,
            ToolOutcome::Error(e) => Some(e.kind),
        };
        Self {
            round,
            call_id: record.result.call_id.clone(),
            tool: record.result.tool.clone(),
            arguments,
            error,
            attempts: record.attempts,
            duration_ms: record.duration.as_millis() as u64,
        }
    }
}

/// Everything a caller gets back for one chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Final answer, or the fallback text when the loop failed
    pub answer: String,
    pub outcome: LoopOutcome,
    /// Full updated history, ready to be sent back with the next message
    pub turns: Vec<Turn>,
    pub round_trips: usize,
    pub trace: Vec<ToolTraceEntry>,
}
