//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, plus per-model
//! failure scripting so the fallback logic can be exercised.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ConverseError, Result};
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Failure a mock model can be scripted to produce.
#[derive(Debug, Clone)]
enum MockFailure {
    /// Simulates HTTP 429 / RESOURCE_EXHAUSTED.
    RateLimited,
    /// Simulates a non-retryable API error.
    Fatal(String),
}

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for unit testing without making real API calls.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response), checked in order
    /// against the last user message.
    responses: Vec<(String, String)>,
    /// Models scripted to fail.
    failures: HashMap<String, MockFailure>,
    /// Models passed to complete calls, in order.
    calls: Mutex<Vec<String>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a response mapping: when the last user message contains
    /// `pattern`, the mock returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.responses.push((pattern.into(), response.into()));
        self
    }

    /// Scripts `model` to always fail with a rate-limit error.
    pub fn with_rate_limited_model(mut self, model: impl Into<String>) -> Self {
        self.failures
            .insert(model.into(), MockFailure::RateLimited);
        self
    }

    /// Scripts `model` to always fail with a non-retryable error.
    pub fn with_failing_model(
        mut self,
        model: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.failures
            .insert(model.into(), MockFailure::Fatal(message.into()));
        self
    }

    /// Returns the models passed to complete calls, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        // Default pattern matching
        if input_lower.contains("all users") || input_lower.contains("show users") {
            return "```sql\nSELECT * FROM users;\n```".to_string();
        }

        if input_lower.contains("count") && input_lower.contains("users") {
            return "```sql\nSELECT COUNT(*) FROM users;\n```".to_string();
        }

        if input_lower.contains("the database returned this data") {
            return "There are 2 users in the database.".to_string();
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, model: &str, messages: &[Message]) -> Result<String> {
        self.calls.lock().unwrap().push(model.to_string());

        match self.failures.get(model) {
            Some(MockFailure::RateLimited) => Err(ConverseError::rate_limited(format!(
                "429 RESOURCE_EXHAUSTED for model {model}"
            ))),
            Some(MockFailure::Fatal(message)) => Err(ConverseError::llm(message.clone())),
            None => Ok(self.mock_response(&Self::extract_user_input(messages))),
        }
    }
}
