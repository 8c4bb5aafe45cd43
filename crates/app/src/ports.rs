//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the loops and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod device_client;
pub mod discovery;
pub mod sun_source;

pub use clock::{Clock, SystemClock};
pub use device_client::DeviceClient;
pub use discovery::{Announcement, DiscoveryEvent, DiscoverySource, DiscoverySubscription};
pub use sun_source::SunTimeSource;
