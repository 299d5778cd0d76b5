//! rumqttc-backed [`CommandPublisher`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;

use relayhub_app::ports::CommandPublisher;
use relayhub_domain::error::RelayHubError;

use crate::config::MqttConfig;
use crate::error::MqttError;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Publishes JSON commands at QoS 1, never retained.
///
/// Publishing never waits on the broker: a request is refused while no
/// session is established or while the outgoing queue is full.
pub struct MqttPublisher {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    driver: Option<JoinHandle<()>>,
}

impl MqttPublisher {
    /// Create the client and spawn the task driving its event loop.
    ///
    /// The connection is established in the background; until the broker
    /// acknowledges it every publish fails with [`MqttError::NotConnected`].
    #[must_use]
    pub fn connect(config: &MqttConfig) -> Self {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));

        let (client, eventloop) = AsyncClient::new(options, config.channel_capacity);
        let connected = Arc::new(AtomicBool::new(false));
        let driver = tokio::spawn(drive(eventloop, Arc::clone(&connected)));

        tracing::info!(
            host = %config.broker_host,
            port = config.broker_port,
            "MQTT publisher started"
        );

        Self {
            client,
            connected,
            driver: Some(driver),
        }
    }

    /// Whether the broker has acknowledged the current session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Disconnect from the broker and stop the event loop task.
    pub fn shutdown(mut self) {
        if let Err(err) = self.client.try_disconnect() {
            tracing::debug!(error = %err, "MQTT disconnect request failed");
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }

    fn send(&self, topic: &str, payload: &serde_json::Value) -> Result<(), MqttError> {
        if !self.is_connected() {
            return Err(MqttError::NotConnected);
        }
        let bytes = serde_json::to_vec(payload)?;
        self.client
            .try_publish(topic, QoS::AtLeastOnce, false, bytes)?;
        Ok(())
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

async fn drive(mut eventloop: EventLoop, connected: Arc<AtomicBool>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::Release);
                tracing::info!("MQTT broker connection established");
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                connected.store(false, Ordering::Release);
                tracing::warn!("MQTT broker closed the session");
            }
            Ok(_) => {}
            Err(err) => {
                connected.store(false, Ordering::Release);
                tracing::warn!(error = %err, "MQTT connection error, retrying");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}

impl CommandPublisher for MqttPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: &serde_json::Value,
    ) -> Result<(), RelayHubError> {
        self.send(topic, payload).map_err(|err| {
            tracing::warn!(topic, error = %err, "MQTT publish failed");
            RelayHubError::from(err)
        })?;
        tracing::debug!(topic, "command queued");
        Ok(())
    }
}
