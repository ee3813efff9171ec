//! Session state shared between the connect and chat flows.
//!
//! Holds the connection profile and schema captured by the last successful
//! connect. The pair is swapped atomically as one unit so a chat call never
//! observes a schema that does not match the stored credentials.

use tokio::sync::RwLock;

use crate::config::ConnectionProfile;
use crate::db::Schema;

/// The profile/schema pair stored after a successful connect.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// Credentials used by each chat turn to open a fresh connection.
    pub profile: ConnectionProfile,
    /// Schema introspected when the profile was stored.
    pub schema: Schema,
}

/// Shared session state: written only by a successful connect, read by every
/// chat call.
///
/// An explicit handle passed through the call chain (via `Arc`), never a
/// process-wide global.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<Option<ActiveSession>>,
}

impl SessionState {
    /// Creates an empty session state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new profile/schema pair, replacing any previous session.
    pub async fn replace(&self, profile: ConnectionProfile, schema: Schema) {
        let mut guard = self.inner.write().await;
        *guard = Some(ActiveSession { profile, schema });
    }

    /// Returns a snapshot of the active session, if connected.
    pub async fn snapshot(&self) -> Option<ActiveSession> {
        self.inner.read().await.clone()
    }

    /// Returns true if a connect has succeeded.
    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
