//! Connect-and-introspect flow.
//!
//! Runs the port probe, the driver connect, and the schema introspection as
//! one bounded operation: at most one connect runs at a time, and the whole
//! thing lives under an outer wall-clock timeout that is independent of the
//! driver's own connect timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::info;

use crate::config::ConnectionProfile;
use crate::db::{probe, ClientFactory, Schema};
use crate::error::{ConverseError, Result};

/// Outer wall-clock timeout around the whole connect/introspect operation.
const OUTER_TIMEOUT_SECS: u64 = 10;

/// Serializes connect/introspect operations and enforces the outer timeout.
///
/// On timeout the in-flight future is dropped, which tears down the pending
/// driver connect rather than leaving it running unsupervised. Queued
/// requests wait on the single permit and are subject to the same deadline.
pub struct Connector {
    factory: Arc<dyn ClientFactory>,
    slot: Arc<Semaphore>,
    probe_timeout: Duration,
    outer_timeout: Duration,
}

impl Connector {
    /// Creates a connector with the default timeouts.
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            slot: Arc::new(Semaphore::new(1)),
            probe_timeout: probe::DEFAULT_PROBE_TIMEOUT,
            outer_timeout: Duration::from_secs(OUTER_TIMEOUT_SECS),
        }
    }

    /// Overrides the probe and outer timeouts.
    pub fn with_timeouts(mut self, probe_timeout: Duration, outer_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self.outer_timeout = outer_timeout;
        self
    }

    /// Connects to the database described by `profile` and introspects its
    /// schema.
    ///
    /// The profile is normalized first (`localhost` becomes `127.0.0.1`), the
    /// port is probed before the driver is involved, and the connection is
    /// closed once the schema has been read. Returns `ConnectTimeout` if the
    /// outer deadline expires, even while a driver connect is still pending.
    pub async fn connect(&self, profile: &ConnectionProfile) -> Result<Schema> {
        let profile = profile.normalized();

        tokio::time::timeout(self.outer_timeout, self.connect_inner(&profile))
            .await
            .map_err(|_| ConverseError::ConnectTimeout)?
    }

    async fn connect_inner(&self, profile: &ConnectionProfile) -> Result<Schema> {
        let _permit = self
            .slot
            .acquire()
            .await
            .map_err(|_| ConverseError::connection("Connect worker unavailable"))?;

        if !probe::is_reachable(&profile.host, profile.port, self.probe_timeout).await {
            return Err(ConverseError::PortUnreachable {
                host: profile.host.clone(),
                port: profile.port,
            });
        }

        let db = self.factory.open(profile).await?;
        let schema = db.introspect_schema().await;
        let _ = db.close().await;

        let schema = schema?;
        info!(
            tables = schema.tables.len(),
            "Connected to {} and fetched schema",
            profile.display_string()
        );
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseClient, MockFactory, Table};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;

    fn profile(host: &str, port: u16) -> ConnectionProfile {
        ConnectionProfile {
            host: host.to_string(),
            port,
            user: "root".to_string(),
            password: String::new(),
            database: "shop".to_string(),
        }
    }

    fn sample_schema() -> Schema {
        Schema {
            tables: vec![Table::new("users").with_column("id", "int")],
        }
    }

    /// Factory whose open call never completes, for timeout tests.
    struct HangingFactory {
        opens: AtomicUsize,
    }

    impl HangingFactory {
        fn new() -> Self {
            Self {
                opens: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ClientFactory for HangingFactory {
        async fn open(&self, _profile: &ConnectionProfile) -> Result<Box<dyn DatabaseClient>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_closed_port_fails_fast_with_port_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let factory = Arc::new(MockFactory::working(
            sample_schema(),
            crate::db::QueryResult::new(),
        ));
        let connector = Connector::new(factory.clone());

        let err = connector
            .connect(&profile("127.0.0.1", port))
            .await
            .unwrap_err();

        assert!(matches!(err, ConverseError::PortUnreachable { .. }));
        // The driver is never reached when the probe fails.
        assert!(factory.opened_profiles().is_empty());
    }

    #[tokio::test]
    async fn test_connect_introspects_through_factory() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let factory = Arc::new(MockFactory::working(
            sample_schema(),
            crate::db::QueryResult::new(),
        ));
        let connector = Connector::new(factory.clone());

        let schema = connector.connect(&profile("127.0.0.1", port)).await.unwrap();

        assert_eq!(schema.table_names(), vec!["users"]);
        assert_eq!(factory.opened_profiles().len(), 1);
    }

    #[tokio::test]
    async fn test_localhost_is_normalized_before_opening() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let factory = Arc::new(MockFactory::working(
            sample_schema(),
            crate::db::QueryResult::new(),
        ));
        let connector = Connector::new(factory.clone());

        connector.connect(&profile("localhost", port)).await.unwrap();

        let opened = factory.opened_profiles();
        assert_eq!(opened[0].host, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_outer_timeout_yields_connect_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let factory = Arc::new(HangingFactory::new());
        let connector = Connector::new(factory.clone())
            .with_timeouts(Duration::from_secs(2), Duration::from_millis(200));

        let err = connector
            .connect(&profile("127.0.0.1", port))
            .await
            .unwrap_err();

        assert!(matches!(err, ConverseError::ConnectTimeout));
        assert_eq!(factory.opens.load(Ordering::SeqCst), 1);
    }

    /// Factory that sleeps in open and records how many opens overlap.
    struct SlowFactory {
        current: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl SlowFactory {
        fn new() -> Self {
            Self {
                current: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ClientFactory for SlowFactory {
        async fn open(&self, _profile: &ConnectionProfile) -> Result<Box<dyn DatabaseClient>> {
            let active = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(active, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(Box::new(
                crate::db::MockDatabaseClient::new().with_schema(sample_schema()),
            ))
        }
    }

    #[tokio::test]
    async fn test_concurrent_connects_queue_behind_single_slot() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let factory = Arc::new(SlowFactory::new());
        let connector = Arc::new(Connector::new(factory.clone()));

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let connector = Arc::clone(&connector);
                let profile = profile("127.0.0.1", port);
                tokio::spawn(async move { connector.connect(&profile).await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        // The single permit keeps connects strictly sequential.
        assert_eq!(factory.max_seen.load(Ordering::SeqCst), 1);
    }
}
