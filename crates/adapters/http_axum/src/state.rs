//! Shared application state for axum handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use switchyard_app::overrides::OverrideTable;
use switchyard_app::ports::DeviceClient;
use switchyard_app::services::console_service::ConsoleService;
use switchyard_app::sun::SunTimeCache;
use switchyard_domain::time::{self, Timestamp};

use crate::auth::Credentials;

/// Application state shared across all axum handlers.
///
/// `Clone` is implemented manually so the device client does not need to be
/// `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<C> {
    /// Manual control and maintenance actions.
    pub console: Arc<ConsoleService<C>>,
    /// Sun times as last resolved.
    pub sun: Arc<SunTimeCache>,
    /// Grace periods armed by the reconciler.
    pub overrides: Arc<OverrideTable>,
    pub credentials: Credentials,
    pub started_at: Timestamp,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            console: Arc::clone(&self.console),
            sun: Arc::clone(&self.sun),
            overrides: Arc::clone(&self.overrides),
            credentials: self.credentials.clone(),
            started_at: self.started_at,
        }
    }
}

impl<C> AppState<C>
where
    C: DeviceClient + 'static,
{
    /// Create the state, stamping the startup time. No users are required
    /// until [`with_users`](Self::with_users) is called.
    pub fn new(console: Arc<ConsoleService<C>>, sun: Arc<SunTimeCache>) -> Self {
        Self {
            console,
            sun,
            overrides: Arc::new(OverrideTable::default()),
            credentials: Credentials::default(),
            started_at: time::now(),
        }
    }

    /// Share the reconciler's override table.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Arc<OverrideTable>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Require one of these users on every `/api` request.
    #[must_use]
    pub fn with_users(mut self, users: BTreeMap<String, String>) -> Self {
        self.credentials = Credentials::new(users);
        self
    }
}
