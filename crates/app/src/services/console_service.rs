//! Console service: manual control and maintenance actions requested by an
//! operator.

use std::sync::Arc;

use serde::Deserialize;

use switchyard_domain::control::ControlCommand;
use switchyard_domain::device::{Device, DeviceAction};
use switchyard_domain::error::{HubError, NotFoundError, ValidationError};
use switchyard_domain::program::ProgramLibrary;
use switchyard_domain::time;

use crate::ports::DeviceClient;
use crate::registry::DeviceRegistry;

/// Device selector accepted by maintenance actions to target every device.
pub const ALL_DEVICES: &str = "all";

/// Controls addressed by a manual command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlTarget {
    /// Restrict to one device, otherwise every device in the zone.
    #[serde(default)]
    pub device: Option<String>,
    pub zone: String,
    pub control: String,
}

/// Application service behind the console API.
pub struct ConsoleService<C> {
    client: Arc<C>,
    registry: Arc<DeviceRegistry>,
    programs: ProgramLibrary,
}

impl<C: DeviceClient> ConsoleService<C> {
    #[must_use]
    pub fn new(client: Arc<C>, registry: Arc<DeviceRegistry>, programs: ProgramLibrary) -> Self {
        Self {
            client,
            registry,
            programs,
        }
    }

    /// List all known devices.
    #[must_use]
    pub fn list_devices(&self) -> Vec<Device> {
        self.registry.snapshot_all()
    }

    /// Look up a device by name.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when the device is not tracked.
    pub fn get_device(&self, name: &str) -> Result<Device, HubError> {
        self.registry.get(name).ok_or_else(|| not_found("Device", name))
    }

    /// Switch matching controls on or off.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when no switch matches the target, or
    /// the device error of the first failing command.
    #[tracing::instrument(skip(self))]
    pub async fn set_switch(&self, target: &ControlTarget, state: bool) -> Result<Vec<Device>, HubError> {
        let command = ControlCommand::new(&target.control).with_state(state);
        let plans = self
            .matching(target)
            .into_iter()
            .filter(|d| d.switch_in(&target.zone, &target.control).is_some())
            .map(|d| (d, command.clone()))
            .collect();
        self.dispatch(target, plans).await
    }

    /// Apply a named program to matching `rgb`/`argb` controls.
    ///
    /// The name is looked up in the library of each control's kind, so an
    /// RGB program never reaches an ARGB strip.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when the program is unknown or no
    /// strip of a kind that has the program matches the target, or the
    /// device error of the first failing command.
    #[tracing::instrument(skip(self))]
    pub async fn apply_program(
        &self,
        target: &ControlTarget,
        program: &str,
    ) -> Result<Vec<Device>, HubError> {
        if !self.programs.contains(program) {
            return Err(not_found("Program", program));
        }
        let plans = self
            .matching(target)
            .into_iter()
            .filter_map(|device| {
                let definition = device
                    .controls()
                    .iter()
                    .filter(|c| c.name() == Some(target.control.as_str()))
                    .find_map(|c| self.programs.get(c.kind(), program))?
                    .clone();
                let command = ControlCommand::new(&target.control).with_program(definition);
                Some((device, command))
            })
            .collect();
        self.dispatch(target, plans).await
    }

    /// Reboot one device, or every device with [`ALL_DEVICES`], and purge it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown device or the device
    /// error when a single named device does not answer.
    pub async fn reboot(&self, name: &str) -> Result<Vec<String>, HubError> {
        self.perform(name, DeviceAction::Reboot, true).await
    }

    /// Ask one device, or every device, to reload its configuration and purge it.
    ///
    /// # Errors
    ///
    /// Same as [`reboot`](Self::reboot).
    pub async fn reconfigure(&self, name: &str) -> Result<Vec<String>, HubError> {
        self.perform(name, DeviceAction::Reconfigure, true).await
    }

    /// Put a device back into access-point mode.
    ///
    /// The device is left in the registry; failed probes will purge it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for [`ALL_DEVICES`], otherwise the
    /// same as [`reboot`](Self::reboot).
    pub async fn ap_mode(&self, name: &str) -> Result<Vec<String>, HubError> {
        if name == ALL_DEVICES {
            return Err(ValidationError::AllDevicesNotAllowed {
                action: DeviceAction::ApMode.to_string(),
            }
            .into());
        }
        self.perform(name, DeviceAction::ApMode, false).await
    }

    #[tracing::instrument(skip(self))]
    async fn perform(
        &self,
        name: &str,
        action: DeviceAction,
        purge: bool,
    ) -> Result<Vec<String>, HubError> {
        if name != ALL_DEVICES {
            let device = self.get_device(name)?;
            self.client.send_action(&device.endpoint, action).await?;
            if purge {
                self.registry.evict(name, &format!("{action} requested"));
            }
            return Ok(vec![device.name]);
        }

        let mut done = Vec::new();
        for device in self.registry.snapshot_all() {
            match self.client.send_action(&device.endpoint, action).await {
                Ok(()) => done.push(device.name),
                Err(err) => tracing::warn!(device = %device.name, %err, "action failed"),
            }
        }
        if purge {
            self.registry.evict_all(&format!("{action} requested for all devices"));
        }
        Ok(done)
    }

    fn matching(&self, target: &ControlTarget) -> Vec<Device> {
        self.registry
            .snapshot_all()
            .into_iter()
            .filter(|d| d.zone() == Some(target.zone.as_str()))
            .filter(|d| target.device.as_deref().is_none_or(|name| d.name == name))
            .collect()
    }

    async fn dispatch(
        &self,
        target: &ControlTarget,
        plans: Vec<(Device, ControlCommand)>,
    ) -> Result<Vec<Device>, HubError> {
        if plans.is_empty() {
            return Err(not_found(
                "Control",
                &format!("{}/{}", target.zone, target.control),
            ));
        }
        let mut updated = Vec::with_capacity(plans.len());
        for (device, command) in plans {
            let status = self
                .client
                .send_controls(&device.endpoint, std::slice::from_ref(&command))
                .await?;
            if let Some(device) = self.registry.upsert(&device.name, status, time::now()) {
                updated.push(device);
            }
        }
        Ok(updated)
    }
}

fn not_found(entity: &'static str, id: &str) -> HubError {
    NotFoundError {
        entity,
        id: id.to_string(),
    }
    .into()
}
