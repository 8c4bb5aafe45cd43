//! Discovery port: service-discovery announcements of devices on the LAN.

use std::future::Future;

use switchyard_domain::error::HubError;

/// A resolved service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Full instance name, e.g. `JBHASD-00A1B2._JBHASD._tcp.local.`.
    pub instance: String,
    pub host: String,
    pub port: u16,
}

/// Event delivered by a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Announced(Announcement),
    /// Advisory only; eviction is driven by failed probes.
    Removed { instance: String },
}

/// Opens discovery subscriptions for a service type.
pub trait DiscoverySource: Send + Sync {
    type Subscription: DiscoverySubscription;

    /// Start browsing. Dropping the subscription stops it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Device`] when the underlying browser cannot start.
    fn subscribe(&self, service_type: &str) -> Result<Self::Subscription, HubError>;
}

/// A live browse session.
pub trait DiscoverySubscription: Send {
    /// Next event, `None` once the session has ended.
    fn next_event(&mut self) -> impl Future<Output = Option<DiscoveryEvent>> + Send;
}
