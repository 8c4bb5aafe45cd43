//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `switchyard.toml` in the working directory, or the path in
//! `SWITCHYARD_CONFIG`. Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values.
//!
//! Besides daemon settings the file carries the rules (`[[timers]]`,
//! `[[paired]]`, `[[device_programs]]`), device profiles (`[profiles.*]`,
//! `[devices.*]`), the named strip programs (`[rgb_programs.*]`,
//! `[argb_programs.*]`) and the console users (`[server.users]`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

use switchyard_adapter_http_reqwest::config::DEFAULT_SUN_URL;
use switchyard_adapter_http_reqwest::{DeviceHttpConfig, SunServiceConfig};
use switchyard_app::discovery::DEFAULT_SERVICE_TYPE;
use switchyard_app::probe::DEFAULT_FAILURE_THRESHOLD;
use switchyard_domain::manual_override::DEFAULT_GRACE_SECS;
use switchyard_domain::profile::{DeviceEntry, DeviceProfiles};
use switchyard_domain::program::{ProgramLibrary, ProgramRule};
use switchyard_domain::rule::{PairedSwitchRule, RuleSet, TimerRule};

const DEFAULT_PATH: &str = "switchyard.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    pub location: LocationConfig,
    pub discovery: DiscoveryConfig,
    pub probe: ProbeConfig,
    pub reconcile: ReconcileConfig,
    pub sun: SunConfig,
    pub timers: Vec<TimerRule>,
    pub paired: Vec<PairedSwitchRule>,
    pub profiles: BTreeMap<String, serde_json::Value>,
    pub devices: BTreeMap<String, DeviceEntry>,
    pub rgb_programs: BTreeMap<String, serde_json::Value>,
    pub argb_programs: BTreeMap<String, serde_json::Value>,
    pub device_programs: Vec<ProgramRule>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Console users and passwords. Empty leaves the API open.
    pub users: BTreeMap<String, String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Where the daemon runs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Fixed offset of local time from UTC, in seconds.
    pub utc_offset_secs: i32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub service_type: String,
    /// Seconds between resubscriptions.
    pub refresh_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub interval_secs: u64,
    /// Consecutive failures before a device is evicted.
    pub failure_threshold: u32,
    /// Timeout of every device request, probes and commands alike.
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub interval_secs: u64,
    /// How long a manual change suppresses the rules.
    pub manual_grace_secs: i64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SunConfig {
    pub url: String,
    /// Sunset is moved earlier and sunrise later by this many seconds.
    pub offset_secs: i64,
    pub refresh_secs: u64,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from the config file (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed or fails
    /// validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&Self::path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Path of the config file.
    #[must_use]
    pub fn path() -> PathBuf {
        std::env::var_os("SWITCHYARD_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_PATH), PathBuf::from)
    }

    /// Read a config file, defaulting everything when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        match Self::read(path) {
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Read a config file that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`], including for a missing file, or
    /// [`ConfigError::Parse`].
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SWITCHYARD_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("SWITCHYARD_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("SWITCHYARD_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("SWITCHYARD_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    /// Check settings and cross references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if FixedOffset::east_opt(self.location.utc_offset_secs).is_none() {
            return Err(ConfigError::Validation(format!(
                "utc_offset_secs {} is out of range",
                self.location.utc_offset_secs
            )));
        }
        if self.discovery.service_type.is_empty() {
            return Err(ConfigError::Validation(
                "discovery service_type must not be empty".to_string(),
            ));
        }
        if self.probe.failure_threshold == 0 {
            return Err(ConfigError::Validation(
                "probe failure_threshold must be at least 1".to_string(),
            ));
        }
        let intervals = [
            ("discovery.refresh_secs", self.discovery.refresh_secs),
            ("probe.interval_secs", self.probe.interval_secs),
            ("probe.timeout_secs", self.probe.timeout_secs),
            ("reconcile.interval_secs", self.reconcile.interval_secs),
            ("sun.refresh_secs", self.sun.refresh_secs),
            ("sun.timeout_secs", self.sun.timeout_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Validation(format!("{name} must be non-zero")));
        }
        if self.reconcile.manual_grace_secs < 0 {
            return Err(ConfigError::Validation(
                "reconcile.manual_grace_secs must not be negative".to_string(),
            ));
        }
        for (device, entry) in &self.devices {
            if !self.profiles.contains_key(&entry.profile) {
                return Err(ConfigError::Validation(format!(
                    "device {device:?} references unknown profile {:?}",
                    entry.profile
                )));
            }
        }
        self.validate_rules()
    }

    /// Check the hot-reloadable part: program events must name programs
    /// that exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the unknown program.
    pub fn validate_rules(&self) -> Result<(), ConfigError> {
        let library = self.programs();
        let unknown = self
            .device_programs
            .iter()
            .flat_map(|rule| rule.events.iter().map(move |event| (rule, event)))
            .find_map(|(rule, event)| {
                let name = event.params.program_name()?;
                (!library.contains(name)).then_some((rule, name))
            });
        if let Some((rule, name)) = unknown {
            return Err(ConfigError::Validation(format!(
                "program event for {}/{} references unknown program {name:?}",
                rule.zone, rule.control
            )));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Local time offset; UTC if out of range.
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.location.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    /// Rules as evaluated by the reconciler.
    #[must_use]
    pub fn rules(&self) -> RuleSet {
        RuleSet {
            timers: self.timers.clone(),
            paired: self.paired.clone(),
            programs: self.device_programs.clone(),
        }
    }

    /// Named RGB and ARGB programs.
    #[must_use]
    pub fn programs(&self) -> ProgramLibrary {
        ProgramLibrary {
            rgb: self.rgb_programs.clone(),
            argb: self.argb_programs.clone(),
        }
    }

    /// Stored configuration pushed to unconfigured devices.
    #[must_use]
    pub fn device_profiles(&self) -> DeviceProfiles {
        DeviceProfiles {
            profiles: self.profiles.clone(),
            devices: self.devices.clone(),
        }
    }

    #[must_use]
    pub fn device_http(&self) -> DeviceHttpConfig {
        DeviceHttpConfig {
            timeout_secs: self.probe.timeout_secs,
            ..DeviceHttpConfig::default()
        }
    }

    #[must_use]
    pub fn sun_service(&self) -> SunServiceConfig {
        SunServiceConfig {
            url: self.sun.url.clone(),
            timeout_secs: self.sun.timeout_secs,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            users: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "switchyardd=info,switchyard=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            refresh_secs: 120,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            timeout_secs: 10,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            manual_grace_secs: DEFAULT_GRACE_SECS,
        }
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SUN_URL.to_string(),
            offset_secs: 1800,
            refresh_secs: 3600,
            timeout_secs: 20,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
