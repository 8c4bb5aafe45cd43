//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use switchyard_domain::control::{Control, ControlCommand, SwitchContext, SwitchControl};
use switchyard_domain::device::{DeviceAction, DeviceStatus, Endpoint};
use switchyard_domain::error::HubError;

use crate::ports::DeviceClient;

/// Scripted in-memory device network keyed by host.
#[derive(Default)]
pub(crate) struct StubClient {
    pub statuses: Mutex<HashMap<String, DeviceStatus>>,
    pub sent: Mutex<Vec<(String, Vec<ControlCommand>)>>,
    pub configured: Mutex<Vec<(String, serde_json::Value)>>,
    pub actions: Mutex<Vec<(String, DeviceAction)>>,
}

impl StubClient {
    pub fn with(statuses: Vec<(&str, DeviceStatus)>) -> Self {
        Self {
            statuses: Mutex::new(
                statuses
                    .into_iter()
                    .map(|(host, status)| (host.to_string(), status))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    fn unreachable(endpoint: &Endpoint) -> HubError {
        HubError::Device(format!("{endpoint} unreachable").into())
    }
}

impl DeviceClient for StubClient {
    async fn fetch_status(&self, endpoint: &Endpoint) -> Result<DeviceStatus, HubError> {
        self.statuses
            .lock()
            .unwrap()
            .get(&endpoint.host)
            .cloned()
            .ok_or_else(|| Self::unreachable(endpoint))
    }

    async fn send_controls(
        &self,
        endpoint: &Endpoint,
        commands: &[ControlCommand],
    ) -> Result<DeviceStatus, HubError> {
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.host.clone(), commands.to_vec()));
        let mut statuses = self.statuses.lock().unwrap();
        let status = statuses
            .get_mut(&endpoint.host)
            .ok_or_else(|| Self::unreachable(endpoint))?;
        for command in commands {
            for control in &mut status.controls {
                if let Control::Switch(switch) = control {
                    if switch.name == command.name {
                        if let Some(state) = command.state {
                            switch.state = state;
                            switch.context = SwitchContext::Network;
                        }
                        if let Some(interval) = command.motion_interval {
                            switch.motion_interval = Some(interval);
                        }
                    }
                }
            }
        }
        Ok(status.clone())
    }

    async fn configure(
        &self,
        endpoint: &Endpoint,
        config: &serde_json::Value,
    ) -> Result<(), HubError> {
        self.configured
            .lock()
            .unwrap()
            .push((endpoint.host.clone(), config.clone()));
        Ok(())
    }

    async fn send_action(
        &self,
        endpoint: &Endpoint,
        action: DeviceAction,
    ) -> Result<(), HubError> {
        if !self.statuses.lock().unwrap().contains_key(&endpoint.host) {
            return Err(Self::unreachable(endpoint));
        }
        self.actions
            .lock()
            .unwrap()
            .push((endpoint.host.clone(), action));
        Ok(())
    }
}

pub(crate) fn switch_status(
    name: &str,
    zone: &str,
    control: &str,
    state: bool,
    context: SwitchContext,
) -> DeviceStatus {
    DeviceStatus {
        name: name.to_string(),
        zone: zone.to_string(),
        controls: vec![Control::Switch(SwitchControl {
            name: control.to_string(),
            state,
            context,
            motion_interval: None,
        })],
        configured: Some(true),
    }
}
