//! Sun-time port: black-box lookup of today's sunrise and sunset.

use std::future::Future;

use switchyard_domain::error::HubError;
use switchyard_domain::sun::SunEvents;

pub trait SunTimeSource: Send + Sync {
    /// Fetch today's sun events.
    fn fetch(&self) -> impl Future<Output = Result<SunEvents, HubError>> + Send;
}
