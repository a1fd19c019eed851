//! Import settings, loadable from a TOML file.

use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transport::TransportConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Probe only this interface instead of every port the system lists.
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Per-read timeout on the serial link.
    pub read_timeout_ms: u64,
    /// Pause after sending, per byte of the request frame.
    pub settle_per_byte_ms: u64,
    /// Pause after the first read timeout inside an answer.
    pub timeout_pause_ms: u64,
    /// Extra attempts for the version query that identifies the watch.
    pub probe_retries: u8,
    /// Extra attempts for each memory block.
    pub read_retries: u8,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
            read_timeout_ms: 1000,
            settle_per_byte_ms: 2,
            timeout_pause_ms: 10,
            probe_retries: 0,
            read_retries: 2,
        }
    }
}

impl ImportConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!("{} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            settle_per_byte: Duration::from_millis(self.settle_per_byte_ms),
            timeout_pause: Duration::from_millis(self.timeout_pause_ms),
        }
    }
}
