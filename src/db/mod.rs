//! Database abstraction layer for Converse.
//!
//! Provides a trait-based interface for database operations, allowing
//! the MySQL backend and test doubles to be used interchangeably.

mod connector;
mod mock;
mod mysql;
pub mod probe;
mod schema;
mod types;

pub use connector::Connector;
pub use mock::{FailingDatabaseClient, MockDatabaseClient, MockFactory};
pub use mysql::MySqlClient;
pub use schema::{Column, Schema, Table};
pub use types::{QueryResult, Row, Value};

use crate::config::ConnectionProfile;
use crate::error::Result;
use async_trait::async_trait;

/// Trait defining the interface for database clients.
///
/// All database operations are async and return Results with ConverseError.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Introspects the database schema, returning table and column information.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL query and returns column names and all result rows.
    async fn execute_query(&self, sql: &str) -> Result<QueryResult>;

    /// Closes the database connection.
    async fn close(&self) -> Result<()>;
}

/// Opens short-lived database clients for a connection profile.
///
/// The seam between the core flows and the real driver: the connector and the
/// orchestrator both open fresh clients through this trait, so tests can
/// substitute mocks.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Opens a new client for the given profile.
    async fn open(&self, profile: &ConnectionProfile) -> Result<Box<dyn DatabaseClient>>;
}

/// The production factory backed by the MySQL driver.
#[derive(Debug, Default)]
pub struct MySqlFactory;

#[async_trait]
impl ClientFactory for MySqlFactory {
    async fn open(&self, profile: &ConnectionProfile) -> Result<Box<dyn DatabaseClient>> {
        let client = MySqlClient::connect(profile).await?;
        Ok(Box::new(client))
    }
}
