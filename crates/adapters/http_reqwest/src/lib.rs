//! # switchyard-adapter-http-reqwest
//!
//! HTTP client adapter built on [reqwest](https://docs.rs/reqwest).
//!
//! ## Responsibilities
//! - Implement [`DeviceClient`](switchyard_app::ports::DeviceClient): status
//!   probes, control commands, configuration pushes and maintenance actions
//! - Implement [`SunTimeSource`](switchyard_app::ports::SunTimeSource) against
//!   a sunrise-sunset style JSON service
//! - Bound every request with the configured timeout
//!
//! ## Dependency rule
//! Depends on `switchyard-app` (for port traits) and `switchyard-domain`
//! (for the wire types). Never leaks reqwest types into the domain.

pub mod config;
pub mod device_client;
pub mod error;
pub mod sun;

pub use config::{DeviceHttpConfig, SunServiceConfig};
pub use device_client::HttpDeviceClient;
pub use error::HttpError;
pub use sun::SunriseSunsetClient;
