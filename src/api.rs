//! Simple async API facade
//!
//! Thin functions over the process-wide system set up by `init()`.

use crate::agent::ChatReply;
use crate::conversation::Turn;
use crate::tools::adapters::notification::Alert;
use crate::tools::ToolDeclaration;
use crate::System;
use anyhow::Result;
use serde::Serialize;

/// Ask a single question with no prior history
///
/// # Example
/// ```no_run
/// use floodwatch::{init, chat};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     init().await?;
///     let reply = chat("Is Kampung Melayu flooded right now?").await?;
///     println!("{}", reply.answer);
///     Ok(())
/// }
/// ```
pub async fn chat(message: impl Into<String>) -> Result<ChatReply> {
    chat_with_history(Vec::new(), message).await
}

/// Continue a conversation; `history` is the `turns` of the previous reply
pub async fn chat_with_history(history: Vec<Turn>, message: impl Into<String>) -> Result<ChatReply> {
    let system = System::global()?;
    Ok(system.chat(history, message).await?)
}

/// Take every UI alert raised since the last call
pub async fn pending_alerts() -> Result<Vec<Alert>> {
    let system = System::global()?;
    Ok(system.alerts().drain().await)
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogOverview {
    pub version: &'static str,
    pub configured: bool,
    pub tools: Vec<ToolDeclaration>,
    pub description: String,
}

/// What the model can call, for display
pub fn catalog_overview() -> Result<CatalogOverview> {
    let system = System::global()?;
    let catalog = system.catalog();
    Ok(CatalogOverview {
        version: catalog.version(),
        configured: system.is_configured(),
        tools: catalog.declarations().cloned().collect(),
        description: catalog.tools_description(),
    })
}

/// Conversation handle that carries history between messages
///
/// History lives in memory only and is dropped with the handle.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Send a message; on success the history is replaced by the reply's
    pub async fn send(&mut self, message: impl Into<String>) -> Result<ChatReply> {
        let reply = chat_with_history(self.turns.clone(), message).await?;
        self.turns = reply.turns.clone();
        Ok(reply)
    }
}
