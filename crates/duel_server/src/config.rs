//! Server configuration.

use crate::error::ConfigError;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Tunables for the listener, connection actors and sessions.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct ServerConfig {
    /// Listen address. `:9000` means port 9000 on all IPv4 interfaces.
    #[setters(into)]
    listen_addr: String,

    /// Pending outbound messages per connection before it is dropped.
    outbound_capacity: usize,

    /// Deadline for writing and flushing one frame.
    write_timeout_ms: u64,

    /// Pause between notifying the survivor of an abandoned session and
    /// closing both connections.
    abandon_grace_ms: u64,

    /// Longest accepted inbound frame, newline excluded.
    max_frame_bytes: usize,

    /// Capacity of a session's inbound event channel.
    event_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: ":9000".to_string(),
            outbound_capacity: 16,
            write_timeout_ms: 5_000,
            abandon_grace_ms: 100,
            max_frame_bytes: 64 * 1024,
            event_capacity: 8,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!(listen_addr = %config.listen_addr, "Config loaded successfully");
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("outbound_capacity", self.outbound_capacity),
            ("event_capacity", self.event_capacity),
            ("max_frame_bytes", self.max_frame_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::new(format!("{name} must be at least 1")));
            }
        }
        if self.listen_addr.trim().is_empty() {
            return Err(ConfigError::new("listen_addr is required"));
        }
        Ok(())
    }

    /// Address in a form the socket layer accepts.
    pub fn bind_addr(&self) -> String {
        normalize_addr(&self.listen_addr)
    }

    /// Write deadline as a duration.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Abandon grace as a duration.
    pub fn abandon_grace(&self) -> Duration {
        Duration::from_millis(self.abandon_grace_ms)
    }
}

/// Expands a bare `:port` into `0.0.0.0:port`; other addresses pass through.
pub fn normalize_addr(addr: &str) -> String {
    let addr = addr.trim();
    match addr.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr(), ":9000");
        assert_eq!(*config.outbound_capacity(), 16);
        assert_eq!(config.write_timeout(), Duration::from_secs(5));
        assert_eq!(config.abandon_grace(), Duration::from_millis(100));
        assert_eq!(*config.max_frame_bytes(), 65_536);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServerConfig::from_toml_str("write_timeout_ms = 250\n").unwrap();
        assert_eq!(config.write_timeout(), Duration::from_millis(250));
        assert_eq!(*config.outbound_capacity(), 16);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = ServerConfig::from_toml_str("outbound_capacity = 0").unwrap_err();
        assert!(err.message.contains("outbound_capacity"));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(ServerConfig::from_toml_str("outbound_capacity = \"lots\"").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_addr = \"127.0.0.1:7000\"").unwrap();
        writeln!(file, "abandon_grace_ms = 10").unwrap();
        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:7000");
        assert_eq!(config.abandon_grace(), Duration::from_millis(10));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.message.contains("Failed to read"));
    }

    #[test]
    fn test_normalize_addr() {
        assert_eq!(normalize_addr(":9000"), "0.0.0.0:9000");
        assert_eq!(normalize_addr("127.0.0.1:9000"), "127.0.0.1:9000");
        assert_eq!(normalize_addr(" :0 "), "0.0.0.0:0");
    }

    #[test]
    fn test_setters() {
        let config = ServerConfig::default()
            .with_listen_addr("127.0.0.1:0")
            .with_outbound_capacity(2);
        assert_eq!(config.listen_addr(), "127.0.0.1:0");
        assert_eq!(*config.outbound_capacity(), 2);
    }
}
