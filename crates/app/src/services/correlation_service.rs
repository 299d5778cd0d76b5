//! Correlation service: publishes device commands and correlates them with
//! the replies devices later write to the response store.
//!
//! Correlation carries no request id: a reply is any matching document that
//! appears inside the recency window. Concurrent requests to the same target
//! can therefore observe each other's replies.

use std::time::Duration;

use serde::Serialize;

use relayhub_domain::command::{ControlCommand, SlaveRequest};
use relayhub_domain::error::{NotFoundError, PublishError, RelayHubError};
use relayhub_domain::id::{DeviceId, TargetIdentity};
use relayhub_domain::normalize::{SlaveReply, normalize};
use relayhub_domain::response::{DEVICE_REPLY_INTERVAL, MatchCriteria, SLAVE_REPLY_INTERVAL};
use relayhub_domain::topic::TopicPurpose;

use crate::ports::{CommandPublisher, DeviceDirectory, ResponseStore, TopicScheme};
use crate::services::identity_resolver::IdentityResolver;
use crate::services::response_poller::ResponsePoller;

/// Time budgets and poll cadences used by [`CorrelationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationSettings {
    /// How long a slave request waits for its reply.
    pub slave_reply_budget: Duration,
    /// How long a liveness check waits.
    pub base_reply_budget: Duration,
    /// How long a sensor-update check waits.
    pub tank_reply_budget: Duration,
    pub slave_reply_interval: Duration,
    pub device_reply_interval: Duration,
}

impl Default for CorrelationSettings {
    fn default() -> Self {
        Self {
            slave_reply_budget: Duration::from_secs(10),
            base_reply_budget: Duration::from_secs(5),
            tank_reply_budget: Duration::from_secs(10),
            slave_reply_interval: SLAVE_REPLY_INTERVAL,
            device_reply_interval: DEVICE_REPLY_INTERVAL,
        }
    }
}

/// A command that was handed to the messaging fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
}

/// Result of a slave request. `reply` is `None` when the device did not
/// answer within the budget; the publish itself still succeeded.
#[derive(Debug, Clone)]
pub struct SlaveOutcome {
    pub topic: String,
    pub reply: Option<SlaveReply>,
}

/// Application service behind the control, setting, slave-request and
/// response-check operations.
pub struct CorrelationService<D, S, P, T> {
    resolver: IdentityResolver<D>,
    poller: ResponsePoller<S>,
    publisher: P,
    topics: T,
    settings: CorrelationSettings,
}

impl<D, S, P, T> CorrelationService<D, S, P, T>
where
    D: DeviceDirectory,
    S: ResponseStore,
    P: CommandPublisher,
    T: TopicScheme,
{
    /// Create a service with the default budgets and cadences.
    pub fn new(directory: D, store: S, publisher: P, topics: T) -> Self {
        Self {
            resolver: IdentityResolver::new(directory),
            poller: ResponsePoller::new(store),
            publisher,
            topics,
            settings: CorrelationSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: CorrelationSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &CorrelationSettings {
        &self.settings
    }

    /// Publish a control command on the device's control topic.
    ///
    /// Does not wait for any reply.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::NotFound`] when the device has no target
    /// identity, or [`RelayHubError::Publish`] when the transport fails.
    #[tracing::instrument(skip(self, command), fields(device_id = %command.device_id))]
    pub async fn control(&self, command: ControlCommand) -> Result<Published, RelayHubError> {
        let target = self.target_for(&command.device_id).await?;
        let topic = self
            .publish(TopicPurpose::Control, &target, &command.payload)
            .await?;
        Ok(Published { topic })
    }

    /// Publish a setting payload on the device's setting topic.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::NotFound`] when the device has no target
    /// identity, or [`RelayHubError::Publish`] wrapping the transport
    /// failure.
    #[tracing::instrument(skip(self, payload))]
    pub async fn setting(
        &self,
        device_id: &DeviceId,
        payload: &serde_json::Value,
    ) -> Result<Published, RelayHubError> {
        let target = self.target_for(device_id).await?;
        let topic = self.publish(TopicPurpose::Setting, &target, payload).await?;
        Ok(Published { topic })
    }

    /// Publish a slave request, then wait for the device's reply.
    ///
    /// Returns as soon as a reply is found. When none arrives within the
    /// budget the outcome carries no reply; that is still a success.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::NotFound`] when the device has no target
    /// identity, or [`RelayHubError::Publish`] when the transport fails, in
    /// which case no polling happens.
    #[tracing::instrument(
        skip(self, request),
        fields(device_id = %request.device_id, sensor_index = request.sensor_index)
    )]
    pub async fn slave_request(&self, request: SlaveRequest) -> Result<SlaveOutcome, RelayHubError> {
        let target = self.target_for(&request.device_id).await?;
        let topic = self
            .publish(TopicPurpose::SlaveRequest, &target, &request.command())
            .await?;

        let criteria =
            MatchCriteria::slave_reply(target).with_interval(self.settings.slave_reply_interval);
        let reply = self
            .poller
            .poll(&criteria, self.settings.slave_reply_budget)
            .await
            .map(|document| SlaveReply::reconcile(normalize(document), &request));

        if reply.is_none() {
            tracing::info!(%topic, "slave request published without confirmation");
        }
        Ok(SlaveOutcome { topic, reply })
    }

    /// Whether the base unit `device_id` sent a liveness reply recently.
    #[tracing::instrument(skip(self))]
    pub async fn is_base_responded(&self, device_id: &DeviceId) -> bool {
        let criteria = MatchCriteria::alive_reply(device_id.clone())
            .with_interval(self.settings.device_reply_interval);
        self.poller
            .poll(&criteria, self.settings.base_reply_budget)
            .await
            .is_some()
    }

    /// Whether sensor `sensor_index` of `device_id` pushed an update recently.
    #[tracing::instrument(skip(self))]
    pub async fn is_tank_responded(&self, device_id: &DeviceId, sensor_index: u32) -> bool {
        let criteria = MatchCriteria::sensor_update(device_id.clone(), sensor_index)
            .with_interval(self.settings.device_reply_interval);
        self.poller
            .poll(&criteria, self.settings.tank_reply_budget)
            .await
            .is_some()
    }

    async fn target_for(&self, device_id: &DeviceId) -> Result<TargetIdentity, RelayHubError> {
        self.resolver.resolve(device_id).await.ok_or_else(|| {
            NotFoundError {
                entity: "Device",
                id: device_id.to_string(),
            }
            .into()
        })
    }

    async fn publish(
        &self,
        purpose: TopicPurpose,
        target: &TargetIdentity,
        command: &(impl Serialize + Sync),
    ) -> Result<String, RelayHubError> {
        let topic = self.topics.topic(purpose, target);
        let payload = match serde_json::to_value(command) {
            Ok(payload) => payload,
            Err(err) => {
                return Err(PublishError {
                    topic,
                    source: Box::new(err),
                }
                .into());
            }
        };

        if let Err(err) = self.publisher.publish(&topic, &payload).await {
            tracing::error!(error = %err, %topic, "publish failed");
            return Err(PublishError {
                topic,
                source: Box::new(err),
            }
            .into());
        }

        tracing::info!(%topic, "command published");
        Ok(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::{Map, Value, json};
    use tokio::time::Instant;

    use crate::testing::{InMemoryDirectory, InMemoryResponseStore, RecordingPublisher, SlashTopics};
    use relayhub_domain::device::DeviceRecord;
    use relayhub_domain::id::SpaceId;
    use relayhub_domain::response::{MatchKey, ResponseDocument, ResponseKind};

    type Service = CorrelationService<
        InMemoryDirectory,
        Arc<InMemoryResponseStore>,
        Arc<RecordingPublisher>,
        SlashTopics,
    >;

    struct Harness {
        service: Service,
        store: Arc<InMemoryResponseStore>,
        publisher: Arc<RecordingPublisher>,
    }

    fn directory() -> InMemoryDirectory {
        let space = SpaceId::new();
        InMemoryDirectory::default()
            .with_device(
                DeviceRecord::builder()
                    .space_id(space)
                    .device_id("D1")
                    .kind("dependent")
                    .parent_id("D0")
                    .build()
                    .unwrap(),
            )
            .with_device(
                DeviceRecord::builder()
                    .space_id(space)
                    .device_id("D0")
                    .kind("independent")
                    .target_identity(TargetIdentity::new("T0").unwrap())
                    .build()
                    .unwrap(),
            )
    }

    fn harness_with(publisher: RecordingPublisher) -> Harness {
        let store = Arc::new(InMemoryResponseStore::default());
        let publisher = Arc::new(publisher);
        let service = CorrelationService::new(
            directory(),
            Arc::clone(&store),
            Arc::clone(&publisher),
            SlashTopics,
        );
        Harness {
            service,
            store,
            publisher,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingPublisher::default())
    }

    fn device(id: &str) -> DeviceId {
        DeviceId::new(id).unwrap()
    }

    fn control(body: Value) -> ControlCommand {
        let Value::Object(body) = body else {
            unreachable!("control body must be an object")
        };
        ControlCommand::from_body(body).unwrap()
    }

    fn slave_request(device_id: &str) -> SlaveRequest {
        SlaveRequest::builder()
            .device_id(device_id)
            .sensor_index(1)
            .channel("3")
            .address_low("0x10")
            .address_high("0x11")
            .range(10)
            .capacity(500)
            .build()
            .unwrap()
    }

    fn slave_reply(body: Value) -> ResponseDocument {
        let Value::Object(body) = body else {
            unreachable!("reply body must be an object")
        };
        ResponseDocument::new(
            MatchKey::TargetIdentity(TargetIdentity::new("T0").unwrap()),
            ResponseKind::SlaveReply,
            body,
        )
    }

    #[tokio::test]
    async fn should_publish_control_to_parent_topic() {
        let h = harness();
        let published = h
            .service
            .control(control(json!({"deviceId": "D1", "pump": "on"})))
            .await
            .unwrap();

        assert_eq!(published.topic, "device/T0/control");
        let sent = h.publisher.published.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, json!({"deviceId": "D1", "pump": "on"}));
    }

    #[tokio::test]
    async fn should_return_not_found_for_unresolvable_device() {
        let h = harness();
        let result = h
            .service
            .control(control(json!({"deviceId": "nobody"})))
            .await;

        assert!(matches!(result, Err(RelayHubError::NotFound(_))));
        assert_eq!(h.publisher.count(), 0);
    }

    #[tokio::test]
    async fn should_wrap_publish_failure_for_control() {
        let h = harness_with(RecordingPublisher::failing());
        let result = h
            .service
            .control(control(json!({"deviceId": "D0"})))
            .await;

        let Err(RelayHubError::Publish(err)) = result else {
            panic!("expected publish error");
        };
        assert_eq!(err.topic, "device/T0/control");
    }

    #[tokio::test]
    async fn should_publish_setting_on_setting_topic() {
        let h = harness();
        let published = h
            .service
            .setting(&device("D0"), &json!({"interval": 60}))
            .await
            .unwrap();

        assert_eq!(published.topic, "device/T0/setting");
        assert_eq!(h.publisher.published.lock().unwrap()[0].1["interval"], 60);
    }

    #[tokio::test]
    async fn should_wrap_publish_failure_for_setting() {
        let h = harness_with(RecordingPublisher::failing());
        let result = h.service.setting(&device("D1"), &json!({})).await;

        let Err(RelayHubError::Publish(err)) = result else {
            panic!("expected publish error");
        };
        assert_eq!(err.topic, "device/T0/setting");
        assert!(matches!(
            err.source.downcast_ref::<RelayHubError>(),
            Some(RelayHubError::Storage(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_return_reply_as_soon_as_it_arrives() {
        let h = harness();
        let writer = Arc::clone(&h.store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            writer.insert(slave_reply(json!({"response": {"status": "ok", "channel": 3}})));
        });

        let started = Instant::now();
        let outcome = h.service.slave_request(slave_request("D1")).await.unwrap();
        let elapsed = started.elapsed();

        assert_eq!(outcome.topic, "device/T0/slaveRequest");
        let reply = outcome.reply.expect("reply should be found");
        assert_eq!(reply.status, json!("ok"));
        assert_eq!(reply.address_low, json!("0x10"));
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed <= Duration::from_millis(3500));
    }

    #[tokio::test(start_paused = true)]
    async fn should_succeed_without_reply_after_budget() {
        let h = harness();

        let started = Instant::now();
        let outcome = h.service.slave_request(slave_request("D1")).await.unwrap();
        let elapsed = started.elapsed();

        assert!(outcome.reply.is_none());
        assert_eq!(h.publisher.count(), 1);
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_millis(10_500));
    }

    #[tokio::test]
    async fn should_publish_coerced_slave_payload() {
        let h = harness();
        h.store.insert(slave_reply(json!({"response": {}})));

        h.service.slave_request(slave_request("D1")).await.unwrap();

        let sent = h.publisher.published.lock().unwrap();
        assert_eq!(
            sent[0].1,
            json!({
                "deviceId": "D1",
                "sensorIndex": 1,
                "mode": 3,
                "channel": 3,
                "addressLow": "0x10",
                "addressHigh": "0x11",
                "range": 10,
                "capacity": 500,
            })
        );
    }

    #[tokio::test]
    async fn should_not_poll_when_slave_publish_fails() {
        let h = harness_with(RecordingPublisher::failing());
        let result = h.service.slave_request(slave_request("D1")).await;

        assert!(matches!(result, Err(RelayHubError::Publish(_))));
        assert_eq!(h.store.queries(), 0);
    }

    #[tokio::test]
    async fn should_not_publish_slave_request_for_unknown_device() {
        let h = harness();
        let result = h.service.slave_request(slave_request("nobody")).await;

        assert!(matches!(result, Err(RelayHubError::NotFound(_))));
        assert_eq!(h.publisher.count(), 0);
        assert_eq!(h.store.queries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_let_concurrent_requests_share_one_reply() {
        let h = harness();
        let writer = Arc::clone(&h.store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            writer.insert(slave_reply(json!({"response": {"status": "ok"}})));
        });

        let (first, second) = tokio::join!(
            h.service.slave_request(slave_request("D1")),
            h.service.slave_request(slave_request("D0")),
        );

        let first = first.unwrap().reply.unwrap();
        let second = second.unwrap().reply.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(h.publisher.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_base_not_responded_after_five_seconds() {
        let h = harness();

        let started = Instant::now();
        let responded = h.service.is_base_responded(&device("X")).await;
        let elapsed = started.elapsed();

        assert!(!responded);
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_base_responded_when_alive_reply_present() {
        let h = harness();
        h.store.insert(ResponseDocument::new(
            MatchKey::DeviceId(device("X")),
            ResponseKind::AliveReply,
            Map::new(),
        ));

        assert!(h.service.is_base_responded(&device("X")).await);
        assert_eq!(h.publisher.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_tank_responded_for_matching_sensor() {
        let h = harness();
        h.store.insert(
            ResponseDocument::new(
                MatchKey::DeviceId(device("X")),
                ResponseKind::Update,
                Map::new(),
            )
            .with_sensor_index(2),
        );

        assert!(h.service.is_tank_responded(&device("X"), 2).await);
        assert!(!h.service.is_tank_responded(&device("X"), 3).await);
    }

    #[test]
    fn should_default_to_documented_budgets() {
        let settings = CorrelationSettings::default();
        assert_eq!(settings.slave_reply_budget, Duration::from_secs(10));
        assert_eq!(settings.base_reply_budget, Duration::from_secs(5));
        assert_eq!(settings.tank_reply_budget, Duration::from_secs(10));
        assert_eq!(settings.slave_reply_interval, Duration::from_millis(500));
        assert_eq!(settings.device_reply_interval, Duration::from_secs(1));
    }
}
