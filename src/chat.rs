//! Text-to-SQL orchestration.
//!
//! The core request/response cycle: prompt the model for SQL grounded in the
//! schema, extract and execute the fenced query, and ask the model to
//! summarize the results in the same chat session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::ConnectionProfile;
use crate::db::{ClientFactory, QueryResult, Schema};
use crate::error::{ConverseError, Result};
use crate::llm::{build_sql_prompt, build_synthesis_prompt, extract_sql, FallbackChat, LlmClient};

/// Maximum characters of SQL echoed into a trace step.
const SQL_PREVIEW_CHARS: usize = 50;

/// Result of a single chat turn, returned to the caller verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    /// Whether the AI interaction itself succeeded. A failed SQL execution is
    /// still a successful turn.
    pub success: bool,

    /// The model's answer (or an error-bearing sentence for failed queries).
    pub response: String,

    /// The extracted SQL, when the model answered with a query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,

    /// Whether the model answered via a SQL query.
    pub is_sql_query: bool,

    /// Ordered human-readable trace of the turn, for transparency.
    pub thought_process: Vec<String>,

    /// Top-level error message when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResult {
    /// Builds the failure result for a top-level error.
    fn failure(error: &ConverseError) -> Self {
        Self {
            success: false,
            response: String::new(),
            sql_query: None,
            is_sql_query: false,
            thought_process: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Drives the text-to-SQL cycle for one user question at a time.
pub struct Orchestrator {
    llm: Option<Arc<dyn LlmClient>>,
    db: Arc<dyn ClientFactory>,
    candidates: Vec<String>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    ///
    /// `llm` is None when no API key is configured; every chat turn then
    /// fails with `ClientNotReady`.
    pub fn new(
        llm: Option<Arc<dyn LlmClient>>,
        db: Arc<dyn ClientFactory>,
        candidates: Vec<String>,
    ) -> Self {
        Self {
            llm,
            db,
            candidates,
        }
    }

    /// Answers a natural-language question against the connected database.
    ///
    /// Never returns an Err: top-level failures are folded into a ChatResult
    /// with `success = false` so the caller gets one uniform shape.
    pub async fn answer(
        &self,
        query: &str,
        schema: &Schema,
        profile: &ConnectionProfile,
    ) -> ChatResult {
        match self.try_answer(query, schema, profile).await {
            Ok(result) => result,
            Err(e) => {
                error!("AI generation error: {e}");
                ChatResult::failure(&e)
            }
        }
    }

    async fn try_answer(
        &self,
        query: &str,
        schema: &Schema,
        profile: &ConnectionProfile,
    ) -> Result<ChatResult> {
        let llm = self.llm.as_ref().ok_or(ConverseError::ClientNotReady)?;

        let mut steps = vec![
            "Analyzing database schema...".to_string(),
            "Identifying relevant tables...".to_string(),
        ];

        let chat = FallbackChat::new(llm.as_ref(), self.candidates.iter().cloned());
        let prompt = build_sql_prompt(schema, query);
        let (mut session, reply) = chat.send(&prompt, &mut steps).await?;

        let Some(sql) = extract_sql(&reply) else {
            // No fenced SQL block: the model answered directly.
            return Ok(ChatResult {
                success: true,
                response: reply,
                sql_query: None,
                is_sql_query: false,
                thought_process: vec![
                    "Analyzed query.".to_string(),
                    format!("Generated direct response with {}.", session.model()),
                ],
                error: None,
            });
        };

        steps.push(format!(
            "Generated SQL ({}): {}...",
            session.model(),
            sql_preview(&sql)
        ));
        steps.push("Executing query against database...".to_string());

        match self.execute(profile, &sql).await {
            Err(db_err) => {
                // A failed query is a valid conversational turn, not a
                // request failure.
                steps.push(format!("Error executing SQL: {db_err}"));
                Ok(ChatResult {
                    success: true,
                    response: format!(
                        "I tried to run a query but encountered an error: {db_err}"
                    ),
                    sql_query: Some(sql),
                    is_sql_query: true,
                    thought_process: steps,
                    error: None,
                })
            }
            Ok(result) => {
                steps.push(format!("Retrieved {} rows of data.", result.row_count()));
                steps.push("Synthesizing natural language answer...".to_string());

                let followup = build_synthesis_prompt(&result, query);
                let response = session.send(&followup).await?;

                info!(
                    rows = result.row_count(),
                    model = session.model(),
                    "Chat turn complete"
                );

                Ok(ChatResult {
                    success: true,
                    response,
                    sql_query: Some(sql),
                    is_sql_query: true,
                    thought_process: steps,
                    error: None,
                })
            }
        }
    }

    /// Opens a fresh connection, executes the extracted SQL verbatim, and
    /// closes the connection.
    async fn execute(&self, profile: &ConnectionProfile, sql: &str) -> Result<QueryResult> {
        let db = self.db.open(&profile.normalized()).await?;
        let result = db.execute_query(sql).await;
        let _ = db.close().await;
        result
    }
}

/// Returns the first characters of the SQL for trace display.
fn sql_preview(sql: &str) -> String {
    sql.chars().take(SQL_PREVIEW_CHARS).collect()
}
