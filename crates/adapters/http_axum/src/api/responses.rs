//! JSON handlers reporting whether a device replied recently.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use relayhub_app::ports::{CommandPublisher, DeviceDirectory, ResponseStore, TopicScheme};
use relayhub_domain::error::{RelayHubError, ValidationError};
use relayhub_domain::id::DeviceId;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckBody {
    pub success: bool,
    pub message: String,
}

/// Possible responses from the response-check endpoints.
pub enum CheckResponse {
    Responded(Json<CheckBody>),
    Silent(Json<CheckBody>),
}

impl CheckResponse {
    fn from_outcome(responded: bool, subject: &str) -> Self {
        if responded {
            Self::Responded(Json(CheckBody {
                success: true,
                message: format!("{subject} responded"),
            }))
        } else {
            Self::Silent(Json(CheckBody {
                success: false,
                message: format!("{subject} did not respond"),
            }))
        }
    }
}

impl IntoResponse for CheckResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Responded(json) => json.into_response(),
            Self::Silent(json) => (StatusCode::NOT_FOUND, json).into_response(),
        }
    }
}

fn parse_device_id(raw: String) -> Result<DeviceId, ApiError> {
    Ok(DeviceId::new(raw)?)
}

fn parse_sensor_index(raw: &str) -> Result<u32, ApiError> {
    raw.parse::<u32>().map_err(|_| {
        ApiError::from(RelayHubError::Validation(ValidationError::InvalidField {
            field: "sensorIndex",
        }))
    })
}

/// `GET /api/devices/:device_id/base-responded`
pub async fn base_responded<D, S, P, T>(
    State(state): State<AppState<D, S, P, T>>,
    Path(device_id): Path<String>,
) -> Result<CheckResponse, ApiError>
where
    D: DeviceDirectory + Send + Sync + 'static,
    S: ResponseStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    T: TopicScheme + Send + Sync + 'static,
{
    let device_id = parse_device_id(device_id)?;
    let responded = state.correlation.is_base_responded(&device_id).await;
    Ok(CheckResponse::from_outcome(
        responded,
        &format!("base {device_id}"),
    ))
}

/// `GET /api/devices/:device_id/sensors/:sensor_index/tank-responded`
pub async fn tank_responded<D, S, P, T>(
    State(state): State<AppState<D, S, P, T>>,
    Path((device_id, sensor_index)): Path<(String, String)>,
) -> Result<CheckResponse, ApiError>
where
    D: DeviceDirectory + Send + Sync + 'static,
    S: ResponseStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    T: TopicScheme + Send + Sync + 'static,
{
    let device_id = parse_device_id(device_id)?;
    let sensor_index = parse_sensor_index(&sensor_index)?;
    let responded = state
        .correlation
        .is_tank_responded(&device_id, sensor_index)
        .await;
    Ok(CheckResponse::from_outcome(
        responded,
        &format!("tank {sensor_index} of {device_id}"),
    ))
}
