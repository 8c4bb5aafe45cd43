//! Probe/purge loop: refreshes every known device's status and evicts the
//! ones that stop answering.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};

use switchyard_domain::device::{Device, DeviceStatus};
use switchyard_domain::error::HubError;
use switchyard_domain::profile::DeviceProfiles;
use switchyard_domain::time;

use crate::ports::DeviceClient;
use crate::registry::DeviceRegistry;

/// Consecutive failed probes after which a device is evicted.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Outcome of one probe pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub probed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub evicted: usize,
    pub configured: usize,
}

/// Periodic prober.
pub struct ProbeLoop<C> {
    client: Arc<C>,
    registry: Arc<DeviceRegistry>,
    profiles: Arc<DeviceProfiles>,
    failure_threshold: u32,
    interval: Duration,
}

impl<C> ProbeLoop<C>
where
    C: DeviceClient + 'static,
{
    #[must_use]
    pub fn new(
        client: Arc<C>,
        registry: Arc<DeviceRegistry>,
        profiles: Arc<DeviceProfiles>,
        failure_threshold: u32,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            registry,
            profiles,
            failure_threshold: failure_threshold.max(1),
            interval,
        }
    }

    /// Spawn the loop on the runtime.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        loop {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// Probe every known device once, concurrently.
    pub async fn tick(&self) -> ProbeReport {
        let mut tasks = JoinSet::new();
        for device in self.registry.snapshot_all() {
            let client = Arc::clone(&self.client);
            tasks.spawn(async move {
                let result = client.fetch_status(&device.endpoint).await;
                (device, result)
            });
        }

        let mut report = ProbeReport::default();
        while let Some(joined) = tasks.join_next().await {
            let (device, result) = match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(%err, "probe task aborted");
                    continue;
                }
            };
            report.probed += 1;
            self.record(&device, result, &mut report).await;
        }

        if report.probed > 0 {
            tracing::info!(
                probed = report.probed,
                succeeded = report.succeeded,
                failed = report.failed,
                evicted = report.evicted,
                configured = report.configured,
                "probe pass finished"
            );
        }
        report
    }

    async fn record(
        &self,
        device: &Device,
        result: Result<DeviceStatus, HubError>,
        report: &mut ProbeReport,
    ) {
        match result {
            Ok(status) if status.needs_configuration() => {
                self.hand_off(device, status, report).await;
            }
            Ok(status) => {
                self.store(&device.name, status);
                report.succeeded += 1;
            }
            Err(err) => {
                report.failed += 1;
                self.count_failure(&device.name, &err, report);
            }
        }
    }

    fn store(&self, name: &str, status: DeviceStatus) {
        if self.registry.upsert(name, status, time::now()).is_none() {
            tracing::debug!(device = %name, "dropping probe result for purged device");
        }
    }

    fn count_failure(&self, name: &str, err: &HubError, report: &mut ProbeReport) {
        let Some(count) = self.registry.touch_failure(name) else {
            return;
        };
        tracing::warn!(device = %name, %err, failures = count, "probe failed");
        if count >= self.failure_threshold {
            let reason = format!("{count} consecutive failed probes");
            if self.registry.evict(name, &reason).is_some() {
                report.evicted += 1;
            }
        }
    }

    /// Push the stored configuration to an unconfigured device, then evict
    /// it so it resurfaces configured.
    #[tracing::instrument(skip_all, fields(device = %device.name))]
    async fn hand_off(&self, device: &Device, status: DeviceStatus, report: &mut ProbeReport) {
        let config = match self.profiles.build_config(&device.name) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(%err, "device is unconfigured and has no stored profile");
                self.store(&device.name, status);
                report.succeeded += 1;
                return;
            }
        };
        match self.client.configure(&device.endpoint, &config).await {
            Ok(()) => {
                tracing::info!("configuration pushed");
                self.registry.evict(&device.name, "configuration pushed");
                report.configured += 1;
            }
            Err(err) => {
                report.failed += 1;
                self.count_failure(&device.name, &err, report);
            }
        }
    }
}
