//! Discovery lifecycle: keeps the registry's address set fed from
//! service-discovery announcements.
//!
//! The subscription is torn down and reopened every refresh interval to
//! bound address staleness. Removal notifications are only logged; failed
//! probes are what evicts a device.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use switchyard_domain::device::Endpoint;
use switchyard_domain::time;

use crate::ports::{Announcement, DiscoveryEvent, DiscoverySource, DiscoverySubscription};
use crate::registry::DeviceRegistry;

/// Default service type browsed for devices.
pub const DEFAULT_SERVICE_TYPE: &str = "_JBHASD._tcp.local.";

/// Device name of a service instance: the label before the first `.`.
#[must_use]
pub fn device_name(instance: &str) -> &str {
    instance.split('.').next().unwrap_or(instance)
}

/// Periodically resubscribing discovery loop.
pub struct DiscoveryLoop<S> {
    source: S,
    registry: Arc<DeviceRegistry>,
    service_type: String,
    refresh: Duration,
}

impl<S> DiscoveryLoop<S>
where
    S: DiscoverySource + 'static,
{
    #[must_use]
    pub fn new(
        source: S,
        registry: Arc<DeviceRegistry>,
        service_type: impl Into<String>,
        refresh: Duration,
    ) -> Self {
        Self {
            source,
            registry,
            service_type: service_type.into(),
            refresh,
        }
    }

    /// Spawn the loop on the runtime.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        loop {
            let applied = self.session().await;
            tracing::debug!(applied, "discovery subscription refreshed");
        }
    }

    /// Run one subscription for a refresh interval.
    ///
    /// Returns the number of announcements applied to the registry.
    pub async fn session(&self) -> usize {
        let deadline = tokio::time::sleep(self.refresh);
        tokio::pin!(deadline);

        let mut subscription = match self.source.subscribe(&self.service_type) {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::warn!(%err, service_type = %self.service_type, "failed to start discovery, retrying next interval");
                deadline.await;
                return 0;
            }
        };

        let mut applied = 0;
        loop {
            tokio::select! {
                () = &mut deadline => break,
                event = subscription.next_event() => match event {
                    Some(DiscoveryEvent::Announced(announcement)) => {
                        self.apply(&announcement);
                        applied += 1;
                    }
                    Some(DiscoveryEvent::Removed { instance }) => {
                        tracing::debug!(%instance, "service removed, waiting for probes to confirm");
                    }
                    None => {
                        tracing::debug!("discovery subscription ended early");
                        (&mut deadline).await;
                        break;
                    }
                },
            }
        }
        applied
    }

    fn apply(&self, announcement: &Announcement) {
        let name = device_name(&announcement.instance);
        if name.is_empty() {
            tracing::debug!(instance = %announcement.instance, "ignoring unnamed service");
            return;
        }
        let endpoint = Endpoint::new(announcement.host.clone(), announcement.port);
        self.registry.upsert_address(name, endpoint, time::now());
    }
}
