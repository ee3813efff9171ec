//! LLM integration for Converse.
//!
//! Provides the client trait, the Gemini implementation, and the chat-session
//! and fallback machinery used by the orchestrator.

pub mod fallback;
pub mod gemini;
pub mod mock;
pub mod parser;
pub mod prompt;
pub mod types;

pub use fallback::FallbackChat;
pub use gemini::{GeminiClient, GeminiConfig};
pub use mock::MockLlmClient;
pub use parser::extract_sql;
pub use prompt::{build_sql_prompt, build_synthesis_prompt};
pub use types::{Conversation, Message, Role};

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM clients that can generate completions.
///
/// Implementations must be thread-safe (Send + Sync) to support async
/// operations. The model is chosen per call so the fallback policy can switch
/// identifiers on a single client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a completion for the given messages with the given model.
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String>;
}

/// A conversation handle bound to one model, scoped to a single request.
///
/// Each send carries the full message history, so a follow-up prompt sees the
/// model's earlier replies.
pub struct ChatSession<'a> {
    client: &'a dyn LlmClient,
    model: String,
    conversation: Conversation,
}

impl<'a> ChatSession<'a> {
    /// Opens a new session for the given model.
    pub fn new(client: &'a dyn LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            conversation: Conversation::new(),
        }
    }

    /// Sends a message and returns the model's reply.
    pub async fn send(&mut self, text: &str) -> Result<String> {
        self.conversation.add_user(text);
        let reply = self
            .client
            .complete(&self.model, self.conversation.messages())
            .await?;
        self.conversation.add_model(reply.as_str());
        Ok(reply)
    }

    /// Returns the model this session is bound to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the conversation history so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

impl<'a> std::fmt::Debug for ChatSession<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("model", &self.model)
            .field("conversation", &self.conversation)
            .finish_non_exhaustive()
    }
}
