//! Configuration management.
//!
//! The surrounding application hands the core an opaque configuration
//! struct; this module supplies it, loadable from a TOML file or
//! `NETCONF_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NetconfError, Result};
use crate::framing::DEFAULT_MAX_CHUNK_SIZE;

/// Core configuration: transport bind point and protocol limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetconfConfig {
    /// Host to bind the transport to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind the transport to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Hello-exchange window in seconds.
    #[serde(default = "default_negotiation_timeout_secs")]
    pub negotiation_timeout_secs: u64,

    /// Maximum size of a single incoming chunk in bytes.
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    830
}

fn default_negotiation_timeout_secs() -> u64 {
    20
}

fn default_max_chunk_size() -> u64 {
    DEFAULT_MAX_CHUNK_SIZE
}

impl Default for NetconfConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            negotiation_timeout_secs: default_negotiation_timeout_secs(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

impl NetconfConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| NetconfError::Config(format!("Failed to read config file: {e}")))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from `NETCONF_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("NETCONF_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("NETCONF_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        if let Ok(val) = std::env::var("NETCONF_NEGOTIATION_TIMEOUT_SECS") {
            if let Ok(val) = val.parse() {
                config.negotiation_timeout_secs = val;
            }
        }
        if let Ok(val) = std::env::var("NETCONF_MAX_CHUNK_SIZE") {
            if let Ok(val) = val.parse() {
                config.max_chunk_size = val;
            }
        }

        config
    }

    /// Bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| NetconfError::Config(format!("invalid bind address: {e}")))
    }

    /// Hello-exchange window as a [`Duration`].
    pub fn negotiation_timeout(&self) -> Duration {
        Duration::from_secs(self.negotiation_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NetconfConfig::default();
        assert_eq!(config.port, 830);
        assert_eq!(config.negotiation_timeout_secs, 20);
        assert_eq!(config.max_chunk_size, 16 * 1024 * 1024);
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:830");
    }

    #[test]
    fn test_from_file_overrides_and_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 4830\nmax_chunk_size = 65536").unwrap();

        let config = NetconfConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 4830);
        assert_eq!(config.max_chunk_size, 65536);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_from_file_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        assert!(matches!(
            NetconfConfig::from_file(file.path()),
            Err(NetconfError::Config(_))
        ));
    }
}
