//! Device client port: the request/response contract spoken by devices.

use std::future::Future;

use switchyard_domain::control::ControlCommand;
use switchyard_domain::device::{DeviceAction, DeviceStatus, Endpoint};
use switchyard_domain::error::HubError;

/// Talks to one device over its HTTP interface.
///
/// Implementations must bound every call with a timeout; the loops never
/// retry within a tick.
pub trait DeviceClient: Send + Sync {
    /// Fetch the full status snapshot.
    fn fetch_status(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<DeviceStatus, HubError>> + Send;

    /// Send control commands; the device answers with its new status.
    fn send_controls(
        &self,
        endpoint: &Endpoint,
        commands: &[ControlCommand],
    ) -> impl Future<Output = Result<DeviceStatus, HubError>> + Send;

    /// Push a configuration body to an unconfigured device.
    fn configure(
        &self,
        endpoint: &Endpoint,
        config: &serde_json::Value,
    ) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Trigger a maintenance action.
    fn send_action(
        &self,
        endpoint: &Endpoint,
        action: DeviceAction,
    ) -> impl Future<Output = Result<(), HubError>> + Send;
}
