//! Publish port: hands command payloads to the messaging fabric.

use std::future::Future;
use std::sync::Arc;

use relayhub_domain::error::RelayHubError;

/// Publishes a JSON payload on a topic. Delivery is at-most-once per call.
pub trait CommandPublisher {
    fn publish(
        &self,
        topic: &str,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<(), RelayHubError>> + Send;
}

impl<T: CommandPublisher + Send + Sync> CommandPublisher for Arc<T> {
    fn publish(
        &self,
        topic: &str,
        payload: &serde_json::Value,
    ) -> impl Future<Output = Result<(), RelayHubError>> + Send {
        (**self).publish(topic, payload)
    }
}
