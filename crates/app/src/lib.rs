//! # switchyard-app
//!
//! Application layer: the reconciliation loops and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceClient`: fetch status, send commands, push configuration
//!   - `DiscoverySource`: subscribe to service-discovery announcements
//!   - `SunTimeSource`: look up today's sunrise and sunset
//!   - `Clock`: current time, swappable in tests
//! - Own the **device registry**, the single point of mutation for device state
//! - Share the **manual override table** between the reconciler and the console
//! - Run the periodic loops: discovery, probe/purge, sun-time refresh and
//!   reconciliation
//! - Provide the **console service** used for manual control and maintenance
//!
//! ## Dependency rule
//! Depends on `switchyard-domain` only (plus `tokio` for tasks, timers and
//! channels). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod discovery;
pub mod overrides;
pub mod ports;
pub mod probe;
pub mod reconciler;
pub mod registry;
pub mod services;
pub mod sun;

#[cfg(test)]
mod testing;
