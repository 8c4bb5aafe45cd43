//! Daemon information.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use switchyard_app::ports::DeviceClient;
use switchyard_domain::manual_override::ManualOverrideRecord;
use switchyard_domain::sun::SunTimes;
use switchyard_domain::time::{self, Timestamp};

use crate::state::AppState;

#[derive(Serialize)]
pub struct SystemInfo {
    pub started_at: Timestamp,
    pub uptime_secs: i64,
    pub devices: usize,
    pub sun: SunTimes,
    pub overrides: Vec<ManualOverrideRecord>,
}

/// `GET /api/system`
pub async fn get<C>(State(state): State<AppState<C>>) -> Json<SystemInfo>
where
    C: DeviceClient + 'static,
{
    let uptime = time::now() - state.started_at;
    Json(SystemInfo {
        started_at: state.started_at,
        uptime_secs: uptime.num_seconds(),
        devices: state.console.list_devices().len(),
        sun: state.sun.current(),
        overrides: state.overrides.records(),
    })
}
