//! # switchyard-adapter-mdns
//!
//! Service-discovery adapter built on [mdns-sd](https://docs.rs/mdns-sd).
//!
//! One [`ServiceDaemon`] is shared by every subscription. Each call to
//! [`DiscoverySource::subscribe`] starts a browse; dropping the
//! subscription stops it, so the discovery loop's periodic resubscribe
//! maps onto a fresh browse each time.

pub mod error;

use std::collections::HashSet;
use std::net::IpAddr;

use mdns_sd::{ServiceDaemon, ServiceEvent};

use switchyard_app::ports::{Announcement, DiscoveryEvent, DiscoverySource, DiscoverySubscription};
use switchyard_domain::error::HubError;

pub use error::MdnsError;

/// [`DiscoverySource`] backed by a multicast DNS daemon.
///
/// Clones share the same daemon.
#[derive(Clone)]
pub struct MdnsDiscovery {
    daemon: ServiceDaemon,
}

impl MdnsDiscovery {
    /// Start the responder daemon.
    ///
    /// # Errors
    ///
    /// Returns [`MdnsError::Daemon`] when no multicast socket can be opened.
    pub fn new() -> Result<Self, MdnsError> {
        let daemon = ServiceDaemon::new().map_err(MdnsError::Daemon)?;
        Ok(Self { daemon })
    }

    /// Stop the daemon thread.
    pub fn shutdown(&self) {
        if let Err(err) = self.daemon.shutdown() {
            tracing::debug!(%err, "mDNS daemon already stopped");
        }
    }
}

impl DiscoverySource for MdnsDiscovery {
    type Subscription = MdnsSubscription;

    fn subscribe(&self, service_type: &str) -> Result<MdnsSubscription, HubError> {
        let receiver = self
            .daemon
            .browse(service_type)
            .map_err(|source| MdnsError::Browse {
                service_type: service_type.to_string(),
                source,
            })?;
        tracing::debug!(service_type, "mDNS browse started");
        Ok(MdnsSubscription {
            daemon: self.daemon.clone(),
            service_type: service_type.to_string(),
            receiver,
        })
    }
}

/// A running browse for one service type.
pub struct MdnsSubscription {
    daemon: ServiceDaemon,
    service_type: String,
    receiver: mdns_sd::Receiver<ServiceEvent>,
}

impl DiscoverySubscription for MdnsSubscription {
    async fn next_event(&mut self) -> Option<DiscoveryEvent> {
        loop {
            let event = self.receiver.recv_async().await.ok()?;
            match event {
                ServiceEvent::ServiceResolved(info) => {
                    let Some(address) = select_address(info.get_addresses()) else {
                        tracing::debug!(instance = info.get_fullname(), "resolved without address");
                        continue;
                    };
                    return Some(DiscoveryEvent::Announced(Announcement {
                        instance: info.get_fullname().to_string(),
                        host: address.to_string(),
                        port: info.get_port(),
                    }));
                }
                ServiceEvent::ServiceRemoved(_, instance) => {
                    return Some(DiscoveryEvent::Removed { instance });
                }
                ServiceEvent::SearchStopped(_) => return None,
                _ => {}
            }
        }
    }
}

impl Drop for MdnsSubscription {
    fn drop(&mut self) {
        if let Err(err) = self.daemon.stop_browse(&self.service_type) {
            tracing::debug!(%err, service_type = %self.service_type, "failed to stop browse");
        }
    }
}

/// Pick the address to reach a device on, IPv4 first.
///
/// The choice among several addresses of one family is deterministic.
#[must_use]
pub fn select_address(addresses: &HashSet<IpAddr>) -> Option<IpAddr> {
    addresses
        .iter()
        .filter(|addr| addr.is_ipv4())
        .min()
        .or_else(|| addresses.iter().min())
        .copied()
}
