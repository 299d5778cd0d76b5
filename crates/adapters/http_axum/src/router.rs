//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use relayhub_app::ports::{CommandPublisher, DeviceDirectory, ResponseStore, TopicScheme};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the API routes under `/api` and includes a [`TraceLayer`] that
/// logs each HTTP request/response at the `DEBUG` level.
pub fn build<D, S, P, T>(state: AppState<D, S, P, T>) -> Router
where
    D: DeviceDirectory + Send + Sync + 'static,
    S: ResponseStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    T: TopicScheme + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
