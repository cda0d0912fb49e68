//! Client configuration file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shade_protocol::{DEFAULT_ADDRESS, DEFAULT_PORT, REQUEST_TIMEOUT_MS};
use shade_sync::ChannelOptions;

use crate::error::CliError;

/// Connection settings, read from YAML.
///
/// ```yaml
/// host: esp_shades.local
/// port: 80
/// request_timeout_ms: 2000
/// connect_timeout_ms: 5000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            connect_timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}
