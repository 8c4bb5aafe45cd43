//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod controls;
#[allow(clippy::missing_errors_doc)]
pub mod devices;
pub mod system;

use axum::Router;
use axum::routing::{get, post};

use switchyard_app::ports::DeviceClient;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<C>() -> Router<AppState<C>>
where
    C: DeviceClient + 'static,
{
    Router::new()
        // Devices
        .route("/devices", get(devices::list::<C>))
        .route("/devices/{name}", get(devices::get::<C>))
        .route("/devices/{name}/reboot", post(devices::reboot::<C>))
        .route("/devices/{name}/reconfigure", post(devices::reconfigure::<C>))
        .route("/devices/{name}/apmode", post(devices::ap_mode::<C>))
        // Manual commands
        .route("/controls", post(controls::send::<C>))
        // System
        .route("/system", get(system::get::<C>))
}
