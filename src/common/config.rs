//! Configuration for the router, the startup probe and the local fixture

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host used to dial cluster members
    pub host: String,

    /// Optional cap on redirect hops; unbounded when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<usize>,

    /// Startup probe settings
    pub probe: ProbeConfig,

    /// Local fixture settings
    pub local: LocalConfig,

    /// Logging level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            max_redirects: None,
            probe: ProbeConfig::default(),
            local: LocalConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Startup probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Wall-clock deadline
    pub timeout_ms: u64,

    /// Delay between two probe ticks
    pub interval_ms: u64,

    /// Throwaway key written (and deleted) by the probe
    pub key: String,

    pub value: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            interval_ms: 100,
            key: "please".to_string(),
            value: "allow".to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Local fixture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Parent directory of the per-node data directories
    pub data_root: PathBuf,

    /// Prefix of every node data directory, followed by the node's port
    pub data_dir_prefix: String,

    pub port_min: u16,
    pub port_max: u16,

    /// How long a fresh node answers without a leader
    pub election_delay_ms: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            data_dir_prefix: "data-mock-".to_string(),
            port_min: 20_000,
            port_max: 40_000,
            election_delay_ms: 0,
        }
    }
}

impl LocalConfig {
    pub fn election_delay(&self) -> Duration {
        Duration::from_millis(self.election_delay_ms)
    }
}

impl Config {
    /// Load configuration from `kvrouter.toml` (optional) and `KVROUTER_*`
    /// environment variables, falling back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("kvrouter"))
    }

    /// Load configuration from the given file stem (optional) plus environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("KVROUTER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::InvalidConfig("host cannot be empty".into()));
        }
        if self.probe.interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "probe.interval_ms must be positive".into(),
            ));
        }
        if self.local.port_min >= self.local.port_max {
            return Err(Error::InvalidConfig(format!(
                "empty port range {}..{}",
                self.local.port_min, self.local.port_max
            )));
        }
        if self.local.data_dir_prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "data_dir_prefix cannot be empty".into(),
            ));
        }
        if self.max_redirects == Some(0) {
            return Err(Error::InvalidConfig(
                "max_redirects must be positive when set".into(),
            ));
        }
        Ok(())
    }
}
