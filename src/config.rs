//! Host-facing configuration: address, transport choice, timeouts, retry budget.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::codec::DEFAULT_PORT;
use crate::error::{Result, ZkError};

/// Which wire carrier to open the session over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stream,
    Datagram,
}

/// Connection parameters for one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    #[serde(default)]
    pub comm_key: Option<u32>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Retry budget for chunk/template reads (§9 "Retry discretion").
    #[serde(default = "default_chunk_retries")]
    pub chunk_retries: u8,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_transport() -> TransportKind {
    TransportKind::Stream
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_chunk_retries() -> u8 {
    3
}

impl DeviceConfig {
    pub fn new(host: impl Into<String>) -> DeviceConfig {
        DeviceConfig {
            host: host.into(),
            port: default_port(),
            transport: default_transport(),
            comm_key: None,
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            chunk_retries: default_chunk_retries(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ZkError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ZkError::Config("port must not be 0".into()));
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_host() {
        let config = DeviceConfig::new("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = DeviceConfig::new("10.0.0.5");
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn defaults_match_spec() {
        let config = DeviceConfig::new("10.0.0.5");
        assert_eq!(config.port, 4370);
        assert_eq!(config.timeout_ms, 60_000);
        assert_eq!(config.chunk_retries, 3);
    }
}
