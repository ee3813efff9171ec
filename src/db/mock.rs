//! Mock database clients for testing.
//!
//! Provide in-memory implementations of `DatabaseClient` and `ClientFactory`
//! so the orchestrator and connector can be exercised without a server.

use super::{ClientFactory, DatabaseClient, QueryResult, Schema, Value};
use crate::config::ConnectionProfile;
use crate::error::{ConverseError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// A mock database client that returns a predefined result and records the
/// SQL it was asked to execute.
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    schema: Schema,
    result: QueryResult,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockDatabaseClient {
    /// Creates a new mock client with an empty schema and a one-row result.
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
            result: QueryResult::with_data(
                vec!["result".to_string()],
                vec![vec![Value::String("mock".to_string())]],
            ),
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the schema returned by introspection.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the result returned by query execution.
    pub fn with_result(mut self, result: QueryResult) -> Self {
        self.result = result;
        self
    }

    /// Shares the executed-SQL log so callers can assert on it after the
    /// client has been boxed away.
    pub fn executed_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    async fn execute_query(&self, sql: &str) -> Result<QueryResult> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(self.result.clone())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A mock database client whose queries always fail with a fixed driver error.
#[derive(Debug)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a failing client with the given error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Err(ConverseError::query(self.message.clone()))
    }

    async fn execute_query(&self, _sql: &str) -> Result<QueryResult> {
        Err(ConverseError::query(self.message.clone()))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// What a `MockFactory` hands out on each open call.
enum MockBehavior {
    /// Clients that succeed, sharing one schema/result/log.
    Working {
        schema: Schema,
        result: QueryResult,
        executed: Arc<Mutex<Vec<String>>>,
    },
    /// Clients whose queries fail with this message.
    FailingQueries(String),
    /// The open call itself fails with this message.
    RefuseConnections(String),
}

/// A `ClientFactory` producing mock clients, for orchestrator and connector
/// tests.
pub struct MockFactory {
    behavior: MockBehavior,
    opened: Arc<Mutex<Vec<ConnectionProfile>>>,
}

impl MockFactory {
    /// Factory whose clients succeed with the given schema and result.
    pub fn working(schema: Schema, result: QueryResult) -> Self {
        Self {
            behavior: MockBehavior::Working {
                schema,
                result,
                executed: Arc::new(Mutex::new(Vec::new())),
            },
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Factory whose clients fail every query with `message`.
    pub fn failing_queries(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::FailingQueries(message.into()),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Factory that refuses to open connections at all.
    pub fn refusing(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::RefuseConnections(message.into()),
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Profiles passed to open calls so far.
    pub fn opened_profiles(&self) -> Vec<ConnectionProfile> {
        self.opened.lock().unwrap().clone()
    }

    /// SQL executed by clients handed out by a `working` factory.
    pub fn executed_sql(&self) -> Vec<String> {
        match &self.behavior {
            MockBehavior::Working { executed, .. } => executed.lock().unwrap().clone(),
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl ClientFactory for MockFactory {
    async fn open(&self, profile: &ConnectionProfile) -> Result<Box<dyn DatabaseClient>> {
        self.opened.lock().unwrap().push(profile.clone());

        match &self.behavior {
            MockBehavior::Working {
                schema,
                result,
                executed,
            } => Ok(Box::new(MockDatabaseClient {
                schema: schema.clone(),
                result: result.clone(),
                executed: Arc::clone(executed),
            })),
            MockBehavior::FailingQueries(message) => {
                Ok(Box::new(FailingDatabaseClient::new(message.clone())))
            }
            MockBehavior::RefuseConnections(message) => {
                Err(ConverseError::connection(message.clone()))
            }
        }
    }
}
