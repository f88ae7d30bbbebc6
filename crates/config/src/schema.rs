//! Configuration types.
//!
//! Every section defaults independently, so a config file only has to name
//! the values it changes. An empty file is a valid configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bytes per configured megabyte of `size_limit_mb`.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SluiceConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub guard: GuardConfig,
}

/// Listener and response-size settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind (e.g. `0.0.0.0`, `127.0.0.1`).
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Largest upstream body, by declared `Content-Length`, that will be
    /// relayed. Measured in MiB.
    #[serde(alias = "sizeLimit")]
    pub size_limit_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            size_limit_mb: 2048,
        }
    }
}

impl ServerConfig {
    /// The size ceiling in bytes.
    #[must_use]
    pub fn size_limit_bytes(&self) -> u64 {
        self.size_limit_mb.saturating_mul(BYTES_PER_MB)
    }

    /// `host:port` suitable for `TcpListener::bind`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Text,
        }
    }
}

/// Additions to the built-in destination allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Exact hostnames. No wildcards, ports or schemes.
    pub extra_hosts: Vec<String>,
}

impl SluiceConfig {
    /// Parse a TOML document and validate the result.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.server.size_limit_mb == 0 {
            return Err(Error::invalid("server.size_limit_mb must be greater than 0"));
        }
        if self.server.host.trim().is_empty() {
            return Err(Error::invalid("server.host must not be empty"));
        }

        let level = self.log.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(Error::invalid(format!(
                "log.level must be one of {}, got {:?}",
                LOG_LEVELS.join("|"),
                self.log.level
            )));
        }

        for host in &self.guard.extra_hosts {
            validate_exact_host(host)?;
        }
        Ok(())
    }
}

fn validate_exact_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(Error::invalid("guard.extra_hosts entries must not be empty"));
    }
    if let Some(bad) = host
        .chars()
        .find(|c| matches!(c, '*' | '/' | ':') || c.is_whitespace())
    {
        return Err(Error::invalid(format!(
            "guard.extra_hosts entry {host:?} contains {bad:?}; only exact hostnames are allowed"
        )));
    }
    Ok(())
}
