//! Orchestration Loop
//!
//! Drives one chat message to completion:
//! 1. Append the user message and ask the model for the next step
//! 2. Dispatch any requested tool batch and append calls and results
//! 3. Repeat until the model answers or the round-trip cap is hit
//!
//! Tool-local failures go back to the model as data. Only an unreachable
//! model or the cap end the loop early, and both still produce an answer.

use super::messages::{ChatReply, LoopOutcome, ToolTraceEntry, FALLBACK_ANSWER};
use crate::config::AgentConfig;
use crate::conversation::{ConversationSession, ToolCallRequest, Turn};
use crate::core::llm::{ModelClient, ModelReply};
use crate::error::{FailureReason, ModelError, ServiceError};
use crate::tools::catalog::ToolCatalog;
use crate::tools::dispatcher::ToolDispatcher;
use std::sync::Arc;

#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    DispatchingTools(Vec<ToolCallRequest>),
    Done(String),
    Failed(FailureReason),
}

pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    dispatcher: ToolDispatcher,
    config: AgentConfig,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ModelClient>, dispatcher: ToolDispatcher, config: AgentConfig) -> Self {
        Self {
            model,
            dispatcher,
            config,
        }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        self.dispatcher.catalog()
    }

    /// Handle one inbound message on top of caller-supplied history.
    ///
    /// Only invalid history is an `Err`; model and tool trouble end up in
    /// `ChatReply::outcome`.
    pub async fn run(
        &self,
        history: Vec<Turn>,
        message: impl Into<String>,
    ) -> Result<ChatReply, ServiceError> {
        let mut session = ConversationSession::resume(history)?;
        session.push_user(message)?;

        let max_iterations = self.config.max_iterations;
        let mut round_trips = 0;
        let mut trace = Vec::new();
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => match self.ask_model(session.turns()).await {
                    Ok(ModelReply::FinalAnswer(text)) => LoopState::Done(text),
                    Ok(ModelReply::ToolCallBatch(calls)) if round_trips >= max_iterations => {
                        tracing::warn!(
                            "Model requested {} more tool call(s) after {} round trips; giving up",
                            calls.len(),
                            round_trips
                        );
                        LoopState::Failed(FailureReason::MaxIterationsExceeded)
                    }
                    Ok(ModelReply::ToolCallBatch(calls)) => LoopState::DispatchingTools(calls),
                    Err(e) => {
                        tracing::error!("Model exchange failed: {}", e);
                        LoopState::Failed(FailureReason::ModelUnavailable)
                    }
                },

                LoopState::DispatchingTools(calls) => {
                    round_trips += 1;
                    tracing::info!(
                        "Tool round {}/{}: {}",
                        round_trips,
                        max_iterations,
                        calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(", ")
                    );

                    let records = self.dispatcher.dispatch_batch(&calls).await;
                    trace.extend(
                        calls
                            .iter()
                            .zip(&records)
                            .map(|(call, record)| {
                                ToolTraceEntry::new(round_trips, call.arguments.clone(), record)
                            }),
                    );

                    session.push_tool_calls(calls)?;
                    session.push_tool_results(records.into_iter().map(|r| r.result).collect())?;
                    LoopState::AwaitingModel
                }

                LoopState::Done(answer) => {
                    tracing::info!("Answered after {} tool round trip(s)", round_trips);
                    return self.finish(session, answer, LoopOutcome::Done, round_trips, trace);
                }

                LoopState::Failed(reason) => {
                    tracing::error!("Request failed ({}); returning fallback answer", reason);
                    return self.finish(
                        session,
                        FALLBACK_ANSWER.to_string(),
                        LoopOutcome::Failed(reason),
                        round_trips,
                        trace,
                    );
                }
            };
        }
    }

    /// One exchange plus up to `model_retries` more; never counts as a round trip
    async fn ask_model(&self, turns: &[Turn]) -> Result<ModelReply, ModelError> {
        let catalog = self.dispatcher.catalog();
        let mut attempt = 0;
        loop {
            match self.model.exchange(turns, catalog).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.config.model_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Model exchange failed ({}), retry {}/{}",
                        e,
                        attempt,
                        self.config.model_retries
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn finish(
        &self,
        mut session: ConversationSession,
        answer: String,
        outcome: LoopOutcome,
        round_trips: usize,
        trace: Vec<ToolTraceEntry>,
    ) -> Result<ChatReply, ServiceError> {
        session.push_model_text(answer.clone())?;
        Ok(ChatReply {
            answer,
            outcome,
            turns: session.into_turns(),
            round_trips,
            trace,
        })
    }
}
