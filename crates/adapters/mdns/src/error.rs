//! mDNS adapter error types.

use switchyard_domain::error::HubError;

/// Errors specific to the mDNS adapter.
#[derive(Debug, thiserror::Error)]
pub enum MdnsError {
    /// The responder daemon could not be started.
    #[error("failed to start mDNS daemon")]
    Daemon(#[source] mdns_sd::Error),

    /// The daemon refused the browse request.
    #[error("failed to browse {service_type}")]
    Browse {
        service_type: String,
        #[source]
        source: mdns_sd::Error,
    },
}

impl MdnsError {
    /// Convert into a [`HubError::Device`] for propagation across port
    /// boundaries.
    #[must_use]
    pub fn into_domain(self) -> HubError {
        HubError::Device(Box::new(self))
    }
}

impl From<MdnsError> for HubError {
    fn from(err: MdnsError) -> Self {
        err.into_domain()
    }
}
