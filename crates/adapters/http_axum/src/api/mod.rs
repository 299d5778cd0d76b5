//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod commands;
#[allow(clippy::missing_errors_doc)]
pub mod responses;

use axum::Router;
use axum::routing::{get, post};

use relayhub_app::ports::{CommandPublisher, DeviceDirectory, ResponseStore, TopicScheme};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<D, S, P, T>() -> Router<AppState<D, S, P, T>>
where
    D: DeviceDirectory + Send + Sync + 'static,
    S: ResponseStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    T: TopicScheme + Send + Sync + 'static,
{
    Router::new()
        // Commands
        .route("/control", post(commands::control::<D, S, P, T>))
        .route("/slave-request", post(commands::slave_request::<D, S, P, T>))
        // Response checks
        .route(
            "/devices/{device_id}/base-responded",
            get(responses::base_responded::<D, S, P, T>),
        )
        .route(
            "/devices/{device_id}/sensors/{sensor_index}/tank-responded",
            get(responses::tank_responded::<D, S, P, T>),
        )
}
