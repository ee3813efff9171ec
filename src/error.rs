//! Error types for Converse.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for Converse operations.
#[derive(Error, Debug)]
pub enum ConverseError {
    /// The LLM client was never initialized (missing API key).
    #[error("AI client not ready")]
    ClientNotReady,

    /// The database port did not accept a TCP connection.
    #[error("Port {port} on {host} is unreachable.")]
    PortUnreachable { host: String, port: u16 },

    /// The connect/introspect operation exceeded its overall deadline.
    #[error("Connection timed out")]
    ConnectTimeout,

    /// Database connection errors (auth failed, unknown database, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The LLM service throttled the request (HTTP 429 / RESOURCE_EXHAUSTED).
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Every candidate model was rate limited.
    #[error("All models exhausted: {0}")]
    AllModelsExhausted(String),

    /// Query execution errors (syntax errors, missing tables, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// Non-retryable LLM API errors (auth, malformed response, transport).
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConverseError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a rate-limit error with the given message.
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if the error is a retryable rate-limit signal.
    ///
    /// Only `RateLimited` qualifies; everything else is propagated without
    /// trying further candidate models.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ClientNotReady => "Client Not Ready",
            Self::PortUnreachable { .. } => "Port Unreachable",
            Self::ConnectTimeout => "Connection Timeout",
            Self::Connection(_) => "Connection Error",
            Self::RateLimited(_) => "Rate Limited",
            Self::AllModelsExhausted(_) => "Models Exhausted",
            Self::Query(_) => "Query Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
        }
    }
}

/// Result type alias using ConverseError.
pub type Result<T> = std::result::Result<T, ConverseError>;
