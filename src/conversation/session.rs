//! Conversation Session
//!
//! Owned by exactly one inbound request and dropped when it completes.
//! Every append is checked against the ordering rules:
//! - a `tool` turn only directly follows a `model` turn that requested tools
//! - it answers every request of that turn, in order, by call id
//! - nothing else may be appended while tool requests are unanswered

use super::{ToolCallRequest, ToolCallResult, Turn};
use crate::error::SessionError;

#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    turns: Vec<Turn>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Resume from caller-supplied history, which is untrusted
    pub fn resume(history: Vec<Turn>) -> Result<Self, SessionError> {
        let mut session = Self::new();
        for turn in history {
            session.append(turn)?;
        }
        if session.pending_calls().is_some() {
            return Err(SessionError::UnansweredToolCalls {
                index: session.turns.len() - 1,
            });
        }
        Ok(session)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn into_turns(self) -> Vec<Turn> {
        self.turns
    }

    /// Tool requests of the last turn, if they are still waiting for results
    pub fn pending_calls(&self) -> Option<&[ToolCallRequest]> {
        self.turns.last().and_then(|t| t.requested_calls())
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.append(Turn::user(text))
    }

    pub fn push_model_text(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.append(Turn::model_text(text))
    }

    pub fn push_tool_calls(&mut self, calls: Vec<ToolCallRequest>) -> Result<(), SessionError> {
        self.append(Turn::tool_calls(calls))
    }

    pub fn push_tool_results(&mut self, results: Vec<ToolCallResult>) -> Result<(), SessionError> {
        self.append(Turn::tool_results(results))
    }

    fn append(&mut self, turn: Turn) -> Result<(), SessionError> {
        let index = self.turns.len();

        if !turn.is_well_formed() {
            return Err(SessionError::RoleMismatch {
                index,
                role: turn.role.to_string(),
            });
        }

        match (self.pending_calls(), turn.results()) {
            (Some(calls), Some(results)) => {
                if calls.len() != results.len() {
                    return Err(SessionError::ResultCountMismatch {
                        index,
                        expected: calls.len(),
                        found: results.len(),
                    });
                }
                if let Some((_, result)) = calls
                    .iter()
                    .zip(results)
                    .find(|(call, result)| call.id != result.call_id)
                {
                    return Err(SessionError::CallIdMismatch {
                        index,
                        call_id: result.call_id.clone(),
                    });
                }
            }
            (Some(_), None) => {
                return Err(SessionError::UnansweredToolCalls { index: index - 1 });
            }
            (None, Some(_)) => return Err(SessionError::OrphanToolTurn { index }),
            (None, None) => {}
        }

        self.turns.push(turn);
        Ok(())
    }
}
