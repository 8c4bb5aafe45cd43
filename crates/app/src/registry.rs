//! Device registry: the single authoritative store of device state.
//!
//! Every operation replaces or removes a whole record under one mutex and
//! never holds it across an `.await`. Readers get cloned snapshots.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use switchyard_domain::device::{Device, DeviceStatus, Endpoint};
use switchyard_domain::time::Timestamp;

/// In-memory registry of known devices keyed by name.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Mutex<BTreeMap<String, Device>>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Device>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a discovered address.
    ///
    /// Creates an address-only entry for unknown devices and updates the
    /// endpoint of known ones. Returns `true` when the device is new.
    pub fn upsert_address(&self, name: &str, endpoint: Endpoint, at: Timestamp) -> bool {
        let mut devices = self.lock();
        if let Some(device) = devices.get_mut(name) {
            if device.endpoint != endpoint {
                tracing::info!(device = %name, from = %device.endpoint, to = %endpoint, "device address changed");
                device.endpoint = endpoint;
            }
            return false;
        }
        tracing::info!(device = %name, %endpoint, "device discovered");
        devices.insert(name.to_string(), Device::discovered(name, endpoint, at));
        true
    }

    /// Store a fresh status snapshot for a device still tracked.
    ///
    /// Resets the failure counter and stamps the probe time. The endpoint
    /// stays whatever discovery last recorded, and a device evicted while the
    /// request was in flight is not brought back. Returns `None` in that case.
    pub fn upsert(&self, name: &str, status: DeviceStatus, at: Timestamp) -> Option<Device> {
        let mut devices = self.lock();
        let device = devices.get_mut(name)?;
        device.status = Some(status);
        device.last_probe = Some(at);
        device.failed_probes = 0;
        Some(device.clone())
    }

    /// Count one more consecutive failed probe.
    ///
    /// Returns the new count, `None` when the device is not tracked.
    pub fn touch_failure(&self, name: &str) -> Option<u32> {
        let mut devices = self.lock();
        let device = devices.get_mut(name)?;
        device.failed_probes = device.failed_probes.saturating_add(1);
        Some(device.failed_probes)
    }

    /// Remove a device and its address.
    pub fn evict(&self, name: &str, reason: &str) -> Option<Device> {
        let removed = self.lock().remove(name);
        if removed.is_some() {
            tracing::info!(device = %name, %reason, "device evicted");
        }
        removed
    }

    /// Remove every device. Returns how many were removed.
    pub fn evict_all(&self, reason: &str) -> usize {
        let removed = std::mem::take(&mut *self.lock());
        tracing::info!(count = removed.len(), %reason, "all devices evicted");
        removed.len()
    }

    /// Point-in-time copy of every device, ordered by name.
    #[must_use]
    pub fn snapshot_all(&self) -> Vec<Device> {
        self.lock().values().cloned().collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Device> {
        self.lock().get(name).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
