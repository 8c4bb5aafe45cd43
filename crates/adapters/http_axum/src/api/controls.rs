//! Manual switch and program commands.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use switchyard_app::ports::DeviceClient;
use switchyard_app::services::console_service::ControlTarget;
use switchyard_domain::device::Device;
use switchyard_domain::error::{HubError, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body: a target plus either a switch state or a program name.
#[derive(Deserialize)]
pub struct ControlRequest {
    #[serde(flatten)]
    pub target: ControlTarget,
    #[serde(default)]
    pub state: Option<bool>,
    #[serde(default)]
    pub program: Option<String>,
}

/// Possible responses from the control endpoint.
pub enum SendResponse {
    Ok(Json<Vec<Device>>),
}

impl IntoResponse for SendResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/controls`
pub async fn send<C>(
    State(state): State<AppState<C>>,
    Json(req): Json<ControlRequest>,
) -> Result<SendResponse, ApiError>
where
    C: DeviceClient + 'static,
{
    let updated = match (req.state, req.program.as_deref()) {
        (Some(on), None) => state.console.set_switch(&req.target, on).await?,
        (None, Some(program)) => state.console.apply_program(&req.target, program).await?,
        _ => return Err(HubError::from(ValidationError::InvalidControlRequest).into()),
    };
    Ok(SendResponse::Ok(Json(updated)))
}
