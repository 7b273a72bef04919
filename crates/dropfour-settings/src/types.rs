//! Settings types with compiled defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP / WebSocket server.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Listener and per-connection behaviour.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind (0 picks a free port).
    pub port: u16,
    /// Directory served under `/static` and as the page fallback.
    pub static_dir: PathBuf,
    /// Outbound frames buffered per connection before sends start failing.
    pub max_send_queue: usize,
    /// Seconds between server Ping frames.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence after which a connection is dropped.
    pub heartbeat_timeout_secs: u64,
    /// Tell a client why its move was refused instead of dropping it silently.
    pub notify_rejections: bool,
    /// Seconds to wait for connections to drain on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: PathBuf::from("./static"),
            max_send_queue: 64,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            notify_rejections: false,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerSettings {
    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Log filter and output format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive. `RUST_LOG` takes precedence.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single line per event.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 8080);
        assert_eq!(s.static_dir, PathBuf::from("./static"));
        assert_eq!(s.max_send_queue, 64);
        assert_eq!(s.heartbeat_interval_secs, 30);
        assert_eq!(s.heartbeat_timeout_secs, 90);
        assert!(!s.notify_rejections);
        assert_eq!(s.shutdown_timeout_secs, 10);
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let s = ServerSettings {
            host: "127.0.0.1".into(),
            port: 9000,
            ..ServerSettings::default()
        };
        assert_eq!(s.bind_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn log_format_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(parsed, LogFormat::Compact);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"server":{"port":1234}}"#).unwrap();
        assert_eq!(s.server.port, 1234);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.logging, LoggingSettings::default());
    }
}
