//! Device profiles: stored configuration pushed to unconfigured devices.
//!
//! A profile is a JSON object shared by many devices. Each device entry
//! names its profile and overlays its own top-level fields and per-control
//! tweaks, including a `custom_name` used to rename a control.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Per-device overlay applied on top of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub profile: String,
    #[serde(default)]
    pub controls: Vec<ControlOverlay>,
    /// Remaining top-level fields (zone, wifi settings, ...).
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Overlay for one control of the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlOverlay {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Profiles and device entries as loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfiles {
    pub profiles: BTreeMap<String, Value>,
    pub devices: BTreeMap<String, DeviceEntry>,
}

impl DeviceProfiles {
    /// Build the configuration body for a device.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingDeviceConfig`] when the device has no
    /// entry, [`ValidationError::UnknownProfile`] when its profile does not
    /// exist and [`ValidationError::InvalidProfile`] when the profile is not
    /// an object.
    pub fn build_config(&self, device: &str) -> Result<Value, ValidationError> {
        let entry = self
            .devices
            .get(device)
            .ok_or_else(|| ValidationError::MissingDeviceConfig {
                device: device.to_string(),
            })?;
        let profile = self.profiles.get(&entry.profile).ok_or_else(|| {
            ValidationError::UnknownProfile {
                device: device.to_string(),
                profile: entry.profile.clone(),
            }
        })?;
        let Value::Object(mut config) = profile.clone() else {
            return Err(ValidationError::InvalidProfile {
                profile: entry.profile.clone(),
            });
        };

        config.insert("profile".to_string(), Value::String(entry.profile.clone()));
        for (key, value) in &entry.fields {
            config.insert(key.clone(), value.clone());
        }

        if let Some(Value::Array(controls)) = config.get_mut("controls") {
            for overlay in &entry.controls {
                let target = controls.iter_mut().filter_map(Value::as_object_mut).find(|c| {
                    c.get("name").and_then(Value::as_str) == Some(overlay.name.as_str())
                });
                let Some(target) = target else {
                    continue;
                };
                for (key, value) in &overlay.fields {
                    target.insert(key.clone(), value.clone());
                }
                if let Some(custom) = &overlay.custom_name {
                    target.insert("name".to_string(), Value::String(custom.clone()));
                }
            }
        }

        Ok(Value::Object(config))
    }
}
