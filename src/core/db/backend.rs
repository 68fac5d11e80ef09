/// Backend Capability Module
///
/// The session engine never talks to a network driver directly. It consumes
/// the two narrow traits defined here, which lets the engine run against the
/// PostgreSQL driver in production and an in-memory fake in tests.

use super::query::{ResultSet, Value};
use crate::core::Result;
use std::time::Duration;
use tracing::debug;

/// An open, reachable connection to one database.
pub trait Backend {
    /// Runs a query-shaped statement and returns at most `max_rows` of its
    /// rows. Collection stops at the cap and the result is marked
    /// truncated when more rows were available.
    fn query(&mut self, sql: &str, max_rows: usize, timeout: Duration) -> Result<ResultSet>;

    /// Runs a command-shaped statement and returns the affected-row count.
    fn exec(&mut self, sql: &str, timeout: Duration) -> Result<u64>;

    /// Releases the connection. Further calls are not expected.
    fn close(&mut self);
}

/// Produces backends bound to a named database.
///
/// A successful `connect` guarantees the database answered a reachability
/// check; a backend that cannot be reached is never handed out.
pub trait Connector {
    type Backend: Backend;

    fn connect(&self, database: &str) -> Result<Self::Backend>;
}

/// Facts about the server reported once after connecting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerInfo {
    pub version: String,
    pub server_encoding: String,
    pub client_encoding: String,
    pub backend_pid: Option<i64>,
}

impl ServerInfo {
    /// Collects server facts; any probe that fails is left empty.
    pub fn fetch<B: Backend>(backend: &mut B, timeout: Duration) -> Self {
        let mut probe = |sql: &str| match backend.query(sql, 1, timeout) {
            Ok(rs) => rs.first_value().cloned(),
            Err(e) => {
                debug!(sql, error = %e, "server info probe failed");
                None
            }
        };

        let text = |v: Option<Value>| v.map(|v| v.to_string()).unwrap_or_default();

        let version = text(probe("SELECT version()"));
        let server_encoding = text(probe("SHOW server_encoding"));
        let client_encoding = text(probe("SHOW client_encoding"));
        let backend_pid = match probe("SELECT pg_backend_pid()") {
            Some(Value::Integer(pid)) => Some(pid),
            Some(other) => other.to_string().parse().ok(),
            None => None,
        };

        ServerInfo {
            version,
            server_encoding,
            client_encoding,
            backend_pid,
        }
    }

    /// The bare version number, e.g. `16.2` out of
    /// `PostgreSQL 16.2 on x86_64-pc-linux-gnu, ...`.
    pub fn version_number(&self) -> &str {
        self.version
            .split_whitespace()
            .nth(1)
            .map(|v| v.trim_end_matches(','))
            .unwrap_or(&self.version)
    }
}
