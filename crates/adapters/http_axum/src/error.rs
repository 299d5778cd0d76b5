//! HTTP error response mapping.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use relayhub_domain::error::RelayHubError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

/// Failure of an API request, rendered as `{"success": false, "message": ..}`.
#[derive(Debug)]
pub enum ApiError {
    /// The request body could not be read as JSON.
    Body(JsonRejection),
    /// The operation itself failed.
    Domain(RelayHubError),
}

impl From<RelayHubError> for ApiError {
    fn from(err: RelayHubError) -> Self {
        Self::Domain(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::Body(rejection) => {
                tracing::debug!(error = %rejection, "rejected request body");
                return error_response(rejection.status(), rejection.body_text());
            }
            Self::Domain(err) => err,
        };
        let (status, message) = match &err {
            RelayHubError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            RelayHubError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            RelayHubError::Publish(err) => {
                tracing::error!(error = ?err, "publish failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to publish command".to_string(),
                )
            }
            RelayHubError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            RelayHubError::Transport(err) => {
                tracing::error!(error = %err, "transport error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        error_response(status, message)
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    let body = ErrorBody {
        success: false,
        message,
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use relayhub_domain::error::{NotFoundError, PublishError, ValidationError};

    fn status_of(err: RelayHubError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn should_map_errors_to_status_codes() {
        assert_eq!(
            status_of(ValidationError::MissingField("deviceId").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                NotFoundError {
                    entity: "Device",
                    id: "X".to_string(),
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(
                PublishError {
                    topic: "device/T0/control".to_string(),
                    source: "broker down".into(),
                }
                .into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(RelayHubError::Storage("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(RelayHubError::Transport("queue full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
