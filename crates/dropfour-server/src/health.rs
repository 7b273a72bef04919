//! `/health` body.

use std::time::Instant;

use serde::Serialize;

/// Liveness plus registry counters.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while serving.
    pub status: &'static str,
    /// Seconds since the server was constructed.
    pub uptime_secs: u64,
    /// Live sessions.
    pub sessions: usize,
    /// Admitted connections across all sessions.
    pub connections: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, sessions: usize, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        sessions,
        connections,
    }
}
