//! HTTP client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Default sun-time lookup URL (Dublin, unformatted ISO-8601 output).
pub const DEFAULT_SUN_URL: &str =
    "https://api.sunrise-sunset.org/json?lat=53.349809&lng=-6.2624431&formatted=0";

/// Settings for device requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceHttpConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl DeviceHttpConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for DeviceHttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("switchyard/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Settings for the sun-time service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SunServiceConfig {
    pub url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl SunServiceConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SunServiceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SUN_URL.to_string(),
            timeout_secs: 20,
        }
    }
}
