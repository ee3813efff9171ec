//! TCP connectivity probe.
//!
//! Cheap reachability check run before a full database connect, so an
//! unreachable server produces a fast, clear error instead of a driver hang.

use std::time::Duration;
use tokio::net::TcpStream;

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Checks whether `host:port` accepts a TCP connection within `timeout`.
///
/// Returns false on timeout, refusal, or resolution failure; never errors.
/// The probe socket is dropped immediately on success.
pub async fn is_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}
