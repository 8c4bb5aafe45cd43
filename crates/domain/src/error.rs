//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HubError`]
//! at port boundaries.

/// Base error crossing the port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// Transport or protocol failure while talking to a device or an
    /// external service.
    #[error("device communication error: {0}")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("invalid clock time {value:?}, expected HH:MM or HHMM")]
    InvalidClockTime { value: String },

    #[error("invalid anchor {value:?}, expected sunset, sunrise or a clock time")]
    InvalidAnchor { value: String },

    #[error("no stored configuration for device {device:?}")]
    MissingDeviceConfig { device: String },

    #[error("device {device:?} references unknown profile {profile:?}")]
    UnknownProfile { device: String, profile: String },

    #[error("profile {profile:?} must be a JSON object")]
    InvalidProfile { profile: String },

    #[error("{action} cannot target every device")]
    AllDevicesNotAllowed { action: String },

    #[error("a control request needs exactly one of state or program")]
    InvalidControlRequest,

    #[error("a program event needs exactly one of time or times")]
    InvalidEventTimes,

    #[error("a program event needs a state or a program")]
    EmptyEventParams,
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id:?} not found")]
pub struct NotFoundError {
    /// Kind of thing looked up, e.g. `"Device"`.
    pub entity: &'static str,
    /// Lookup key.
    pub id: String,
}
