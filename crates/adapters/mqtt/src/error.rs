//! MQTT adapter error types.

use relayhub_domain::error::RelayHubError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The rumqttc client rejected the request: the outgoing queue is full,
    /// the event loop is closed or the topic is invalid.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// No broker session is currently established.
    #[error("MQTT broker is not connected")]
    NotConnected,

    /// Failed to encode an outgoing payload as JSON.
    #[error("failed to serialize MQTT payload")]
    PayloadSerialize(#[source] serde_json::Error),
}

impl From<rumqttc::ClientError> for MqttError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Client(err)
    }
}

impl From<serde_json::Error> for MqttError {
    fn from(err: serde_json::Error) -> Self {
        Self::PayloadSerialize(err)
    }
}

impl From<MqttError> for RelayHubError {
    fn from(err: MqttError) -> Self {
        RelayHubError::Transport(Box::new(err))
    }
}
