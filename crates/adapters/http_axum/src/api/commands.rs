//! JSON handlers that publish device commands.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use relayhub_app::ports::{CommandPublisher, DeviceDirectory, ResponseStore, TopicScheme};
use relayhub_domain::command::{ControlCommand, SlaveRequest};
use relayhub_domain::normalize::SlaveReply;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a slave request. Every field is taken as sent and
/// validated by the domain builder, which also coerces numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaveRequestBody {
    pub device_id: Option<Value>,
    pub sensor_index: Option<Value>,
    pub mode: Option<Value>,
    pub channel: Option<Value>,
    pub address_low: Option<Value>,
    pub address_high: Option<Value>,
    pub range: Option<Value>,
    pub capacity: Option<Value>,
    pub slave_id: Option<Value>,
}

impl SlaveRequestBody {
    fn into_request(self) -> Result<SlaveRequest, ApiError> {
        let mut builder = SlaveRequest::builder();
        if let Some(value) = self.device_id {
            builder = builder.device_id(value);
        }
        if let Some(value) = self.sensor_index {
            builder = builder.sensor_index(value);
        }
        if let Some(value) = self.mode {
            builder = builder.mode(value);
        }
        if let Some(value) = self.channel {
            builder = builder.channel(value);
        }
        if let Some(value) = self.address_low {
            builder = builder.address_low(value);
        }
        if let Some(value) = self.address_high {
            builder = builder.address_high(value);
        }
        if let Some(value) = self.range {
            builder = builder.range(value);
        }
        if let Some(value) = self.capacity {
            builder = builder.capacity(value);
        }
        if let Some(value) = self.slave_id {
            builder = builder.slave_id(value);
        }
        Ok(builder.build()?)
    }
}

#[derive(Debug, Serialize)]
pub struct PublishedBody {
    pub success: bool,
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct SlaveOutcomeBody {
    pub success: bool,
    pub message: String,
    pub data: Option<SlaveReply>,
}

/// Possible responses from the control endpoint.
pub enum ControlResponse {
    Ok(Json<PublishedBody>),
}

impl IntoResponse for ControlResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the slave-request endpoint.
pub enum SlaveRequestResponse {
    Ok(Json<SlaveOutcomeBody>),
}

impl IntoResponse for SlaveRequestResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `POST /api/control`
///
/// The whole body is forwarded to the device. A body that is not a JSON
/// object is treated as one without a `deviceId`; a body that is not JSON
/// at all is rejected with the usual error envelope.
pub async fn control<D, S, P, T>(
    State(state): State<AppState<D, S, P, T>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<ControlResponse, ApiError>
where
    D: DeviceDirectory + Send + Sync + 'static,
    S: ResponseStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    T: TopicScheme + Send + Sync + 'static,
{
    let Json(body) = body?;
    let body = match body {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let command = ControlCommand::from_body(body)?;
    let published = state.correlation.control(command).await?;
    Ok(ControlResponse::Ok(Json(PublishedBody {
        success: true,
        topic: published.topic,
    })))
}

/// `POST /api/slave-request`
///
/// Publishes the request and waits for the device's reply. A missing reply
/// is not an error: `data` is `null`.
pub async fn slave_request<D, S, P, T>(
    State(state): State<AppState<D, S, P, T>>,
    body: Result<Json<SlaveRequestBody>, JsonRejection>,
) -> Result<SlaveRequestResponse, ApiError>
where
    D: DeviceDirectory + Send + Sync + 'static,
    S: ResponseStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    T: TopicScheme + Send + Sync + 'static,
{
    let Json(body) = body?;
    let request = body.into_request()?;
    let outcome = state.correlation.slave_request(request).await?;
    let message = if outcome.reply.is_some() {
        format!("slave request published on {} and answered", outcome.topic)
    } else {
        format!("slave request published on {}, no reply received", outcome.topic)
    };
    Ok(SlaveRequestResponse::Ok(Json(SlaveOutcomeBody {
        success: true,
        message,
        data: outcome.reply,
    })))
}
