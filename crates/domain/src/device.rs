//! Device: a networked node discovered on the LAN that exposes controls.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::control::{Control, SwitchControl, flag};
use crate::time::Timestamp;

/// Network location of a device's HTTP interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL without trailing slash, e.g. `http://192.168.1.20:80`.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

/// Status body reported by a device on probe or as a command response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub name: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub controls: Vec<Control>,
    /// `Some(false)` when the device is waiting for a configuration push.
    #[serde(
        default,
        deserialize_with = "flag::deserialize_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub configured: Option<bool>,
}

impl DeviceStatus {
    /// Whether the device explicitly reports itself as unconfigured.
    #[must_use]
    pub fn needs_configuration(&self) -> bool {
        self.configured == Some(false)
    }

    /// Find a control by name.
    #[must_use]
    pub fn control(&self, name: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.name() == Some(name))
    }

    /// Iterate over the switch controls.
    pub fn switches(&self) -> impl Iterator<Item = &SwitchControl> {
        self.controls.iter().filter_map(Control::as_switch)
    }
}

/// A device tracked by the registry.
///
/// Created address-only when discovery announces it; `status` is filled by
/// the first successful probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub endpoint: Endpoint,
    pub status: Option<DeviceStatus>,
    pub discovered_at: Timestamp,
    pub last_probe: Option<Timestamp>,
    pub failed_probes: u32,
}

impl Device {
    /// A freshly announced device with no status yet.
    #[must_use]
    pub fn discovered(name: impl Into<String>, endpoint: Endpoint, at: Timestamp) -> Self {
        Self {
            name: name.into(),
            endpoint,
            status: None,
            discovered_at: at,
            last_probe: None,
            failed_probes: 0,
        }
    }

    /// Zone from the last status snapshot.
    #[must_use]
    pub fn zone(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.zone.as_str())
    }

    /// Controls from the last status snapshot, empty before the first probe.
    #[must_use]
    pub fn controls(&self) -> &[Control] {
        self.status.as_ref().map_or(&[], |s| s.controls.as_slice())
    }

    /// Find a switch by zone and control name.
    #[must_use]
    pub fn switch_in(&self, zone: &str, control: &str) -> Option<&SwitchControl> {
        let status = self.status.as_ref()?;
        if status.zone != zone {
            return None;
        }
        status.switches().find(|s| s.name == control)
    }
}

/// Look up the reported state of a switch across a device snapshot.
#[must_use]
pub fn switch_state(devices: &[Device], zone: &str, control: &str) -> Option<bool> {
    devices
        .iter()
        .find_map(|d| d.switch_in(zone, control))
        .map(|s| s.state)
}

/// Maintenance actions a device exposes as plain `GET` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAction {
    Reboot,
    Reconfigure,
    ApMode,
}

impl DeviceAction {
    /// Path of the action endpoint on the device.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Reboot => "/reboot",
            Self::Reconfigure => "/reconfigure",
            Self::ApMode => "/apmode",
        }
    }
}

impl fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Reboot => "reboot",
            Self::Reconfigure => "reconfigure",
            Self::ApMode => "apmode",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::SwitchContext;

    const STATUS: &str = r#"{
        "name": "JBHASD-00A1B2",
        "zone": "Kitchen",
        "configured": 1,
        "wifi_ssid": "home",
        "controls": [
            {"name": "Lights", "type": "switch", "state": 0, "context": "init"},
            {"name": "Temp", "type": "temp/humidity", "temp": 21.5, "humidity": 40.0}
        ]
    }"#;

    #[test]
    fn should_parse_device_status_ignoring_extra_fields() {
        let status: DeviceStatus = serde_json::from_str(STATUS).unwrap();
        assert_eq!(status.zone, "Kitchen");
        assert_eq!(status.configured, Some(true));
        assert_eq!(status.controls.len(), 2);
        assert!(!status.needs_configuration());
        let lights = status.switches().next().unwrap();
        assert_eq!(lights.context, SwitchContext::Init);
    }

    #[test]
    fn should_detect_unconfigured_device() {
        let status: DeviceStatus =
            serde_json::from_str(r#"{"name":"JBHASD-00A1B2","configured":0}"#).unwrap();
        assert!(status.needs_configuration());
        assert!(status.controls.is_empty());
    }

    #[test]
    fn should_reject_status_without_name() {
        assert!(serde_json::from_str::<DeviceStatus>(r#"{"zone":"Kitchen"}"#).is_err());
    }

    #[test]
    fn should_format_base_url() {
        assert_eq!(
            Endpoint::new("192.168.1.20", 80).base_url(),
            "http://192.168.1.20:80"
        );
        assert_eq!(Endpoint::new("fe80::1", 8080).base_url(), "http://[fe80::1]:8080");
    }

    #[test]
    fn should_find_switch_state_by_zone_and_control() {
        let mut device = Device::discovered(
            "JBHASD-00A1B2",
            Endpoint::new("10.0.0.2", 80),
            crate::time::now(),
        );
        assert_eq!(switch_state(std::slice::from_ref(&device), "Kitchen", "Lights"), None);

        device.status = Some(serde_json::from_str(STATUS).unwrap());
        let devices = [device];
        assert_eq!(switch_state(&devices, "Kitchen", "Lights"), Some(false));
        assert_eq!(switch_state(&devices, "Hall", "Lights"), None);
        assert_eq!(switch_state(&devices, "Kitchen", "Temp"), None);
    }

    #[test]
    fn should_map_actions_to_paths() {
        assert_eq!(DeviceAction::Reboot.path(), "/reboot");
        assert_eq!(DeviceAction::ApMode.to_string(), "apmode");
    }
}
