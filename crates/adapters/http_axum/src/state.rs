//! Shared application state for axum handlers.

use std::sync::Arc;

use relayhub_app::ports::{CommandPublisher, DeviceDirectory, ResponseStore, TopicScheme};
use relayhub_app::services::correlation_service::CorrelationService;

/// Application state shared across all axum handlers.
///
/// Generic over the directory, response store, publisher and topic scheme
/// to avoid dynamic dispatch. `Clone` is implemented manually so the
/// underlying types themselves do not need to be `Clone`.
pub struct AppState<D, S, P, T> {
    /// Command publishing and response correlation.
    pub correlation: Arc<CorrelationService<D, S, P, T>>,
}

impl<D, S, P, T> Clone for AppState<D, S, P, T> {
    fn clone(&self) -> Self {
        Self {
            correlation: Arc::clone(&self.correlation),
        }
    }
}

impl<D, S, P, T> AppState<D, S, P, T>
where
    D: DeviceDirectory + Send + Sync + 'static,
    S: ResponseStore + Send + Sync + 'static,
    P: CommandPublisher + Send + Sync + 'static,
    T: TopicScheme + Send + Sync + 'static,
{
    /// Create a new application state from a service instance.
    pub fn new(correlation: CorrelationService<D, S, P, T>) -> Self {
        Self {
            correlation: Arc::new(correlation),
        }
    }

    /// Create a new application state from a pre-wrapped service.
    pub fn from_arc(correlation: Arc<CorrelationService<D, S, P, T>>) -> Self {
        Self { correlation }
    }
}
