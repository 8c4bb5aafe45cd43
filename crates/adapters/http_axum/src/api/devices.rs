//! JSON REST handlers for devices.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use switchyard_app::ports::DeviceClient;
use switchyard_domain::device::Device;

use crate::error::ApiError;
use crate::state::AppState;

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get endpoint.
pub enum GetResponse {
    Ok(Json<Device>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the maintenance action endpoints.
pub enum ActionResponse {
    NoContent,
}

impl IntoResponse for ActionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/devices`
pub async fn list<C>(State(state): State<AppState<C>>) -> ListResponse
where
    C: DeviceClient + 'static,
{
    ListResponse::Ok(Json(state.console.list_devices()))
}

/// `GET /api/devices/{name}`
pub async fn get<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
) -> Result<GetResponse, ApiError>
where
    C: DeviceClient + 'static,
{
    let device = state.console.get_device(&name)?;
    Ok(GetResponse::Ok(Json(device)))
}

/// `POST /api/devices/{name}/reboot`
pub async fn reboot<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
) -> Result<ActionResponse, ApiError>
where
    C: DeviceClient + 'static,
{
    state.console.reboot(&name).await?;
    Ok(ActionResponse::NoContent)
}

/// `POST /api/devices/{name}/reconfigure`
pub async fn reconfigure<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
) -> Result<ActionResponse, ApiError>
where
    C: DeviceClient + 'static,
{
    state.console.reconfigure(&name).await?;
    Ok(ActionResponse::NoContent)
}

/// `POST /api/devices/{name}/apmode`
pub async fn ap_mode<C>(
    State(state): State<AppState<C>>,
    Path(name): Path<String>,
) -> Result<ActionResponse, ApiError>
where
    C: DeviceClient + 'static,
{
    state.console.ap_mode(&name).await?;
    Ok(ActionResponse::NoContent)
}
