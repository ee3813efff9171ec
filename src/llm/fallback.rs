//! Model-fallback chat client.
//!
//! Wraps LLM calls with the rate-limit policy: try candidate models in order,
//! switching to the next immediately when one is throttled. Switching models
//! sidesteps the exhausted quota, so no backoff delay is applied.

use tracing::{info, warn};

use crate::error::{ConverseError, Result};
use crate::llm::{ChatSession, LlmClient};

/// Sends prompts through an ordered list of candidate models.
pub struct FallbackChat<'a> {
    client: &'a dyn LlmClient,
    candidates: Vec<String>,
}

impl<'a> FallbackChat<'a> {
    /// Creates a fallback client over the given candidates.
    ///
    /// Repeated identifiers are de-duplicated, preserving first occurrence
    /// order, so a config whose fallback equals the primary yields a single
    /// attempt.
    pub fn new(client: &'a dyn LlmClient, candidates: impl IntoIterator<Item = String>) -> Self {
        let mut deduped: Vec<String> = Vec::new();
        for candidate in candidates {
            if !deduped.contains(&candidate) {
                deduped.push(candidate);
            }
        }

        Self {
            client,
            candidates: deduped,
        }
    }

    /// Returns the de-duplicated candidate list.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Sends `prompt` through the first candidate model that is not rate
    /// limited, returning the open session and the reply.
    ///
    /// Each skipped candidate appends a human-readable entry to `trace`.
    /// Non-rate-limit errors propagate immediately without trying further
    /// candidates; exhausting every candidate yields `AllModelsExhausted`
    /// carrying the last rate-limit message.
    pub async fn send(
        &self,
        prompt: &str,
        trace: &mut Vec<String>,
    ) -> Result<(ChatSession<'a>, String)> {
        let mut last_rate_limit: Option<ConverseError> = None;

        for model in &self.candidates {
            info!(model = model.as_str(), "Attempting to generate response");

            let mut session = ChatSession::new(self.client, model.clone());
            match session.send(prompt).await {
                Ok(reply) => return Ok((session, reply)),
                Err(e) if e.is_rate_limited() => {
                    warn!(model = model.as_str(), "Rate limit hit, trying next model");
                    trace.push(format!(
                        "Rate limit hit for {model}. Switching backup model..."
                    ));
                    last_rate_limit = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let detail = last_rate_limit
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no candidate models configured".to_string());
        Err(ConverseError::AllModelsExhausted(detail))
    }
}
