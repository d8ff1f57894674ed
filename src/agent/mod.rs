//! Tool-calling agent: the orchestration loop and its reply types

pub mod messages;
pub mod orchestrator;

pub use messages::{ChatReply, LoopOutcome, ToolTraceEntry, FALLBACK_ANSWER};
pub use orchestrator::Orchestrator;
