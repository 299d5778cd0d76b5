//! In-memory port doubles shared by the service tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use relayhub_domain::device::{DeviceKind, DeviceRecord, SensorMetadata};
use relayhub_domain::error::RelayHubError;
use relayhub_domain::id::{DeviceId, SpaceId, TargetIdentity};
use relayhub_domain::response::{MatchCriteria, RawId, ResponseDocument};
use relayhub_domain::time::Timestamp;
use relayhub_domain::topic::TopicPurpose;

use crate::ports::{CommandPublisher, DeviceDirectory, ResponseStore, TopicScheme};

fn unavailable() -> RelayHubError {
    RelayHubError::Storage(Box::new(std::io::Error::other("store unavailable")))
}

#[derive(Default)]
pub struct InMemoryDirectory {
    metadata: Mutex<Vec<SensorMetadata>>,
    devices: Mutex<Vec<DeviceRecord>>,
    pub fail_metadata: bool,
    pub fail_devices: bool,
}

impl InMemoryDirectory {
    pub fn with_metadata(self, device_id: &str, target: Option<&str>) -> Self {
        self.metadata.lock().unwrap().push(SensorMetadata {
            device_id: DeviceId::new(device_id).unwrap(),
            target_identity: target.map(|t| TargetIdentity::new(t).unwrap()),
        });
        self
    }

    pub fn with_device(self, record: DeviceRecord) -> Self {
        self.devices.lock().unwrap().push(record);
        self
    }
}

impl DeviceDirectory for InMemoryDirectory {
    async fn find_sensor_metadata(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<SensorMetadata>, RelayHubError> {
        if self.fail_metadata {
            return Err(unavailable());
        }
        let metadata = self.metadata.lock().unwrap();
        Ok(metadata.iter().find(|m| &m.device_id == device_id).cloned())
    }

    async fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> Result<Vec<DeviceRecord>, RelayHubError> {
        if self.fail_devices {
            return Err(unavailable());
        }
        let devices = self.devices.lock().unwrap();
        Ok(devices
            .iter()
            .filter(|d| &d.device_id == device_id)
            .cloned()
            .collect())
    }

    async fn find_in_space(
        &self,
        space_id: SpaceId,
        device_id: &DeviceId,
        kind: &DeviceKind,
    ) -> Result<Option<DeviceRecord>, RelayHubError> {
        let devices = self.devices.lock().unwrap();
        Ok(devices
            .iter()
            .find(|d| d.space_id == space_id && &d.device_id == device_id && &d.kind == kind)
            .cloned())
    }
}

/// Response store that can be filled while a poll is in flight and can be
/// told to fail its next few queries.
#[derive(Default)]
pub struct InMemoryResponseStore {
    documents: Mutex<Vec<ResponseDocument>>,
    failures: AtomicUsize,
    queries: AtomicUsize,
    latency: Mutex<Duration>,
}

impl InMemoryResponseStore {
    pub fn insert(&self, mut document: ResponseDocument) {
        let mut documents = self.documents.lock().unwrap();
        document.id = RawId(serde_json::Value::from(documents.len() + 1));
        documents.push(document);
    }

    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Make every following query take `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl ResponseStore for InMemoryResponseStore {
    async fn find_latest(
        &self,
        criteria: &MatchCriteria,
        since: Timestamp,
    ) -> Result<Option<ResponseDocument>, RelayHubError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(unavailable());
        }
        let documents = self.documents.lock().unwrap();
        Ok(documents
            .iter()
            .filter(|doc| criteria.matches(doc, since))
            .max_by_key(|doc| doc.inserted_at)
            .cloned())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(String, serde_json::Value)>>,
    pub fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

impl CommandPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &serde_json::Value) -> Result<(), RelayHubError> {
        if self.fail {
            return Err(RelayHubError::Storage(Box::new(std::io::Error::other(
                "broker unreachable",
            ))));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.clone()));
        Ok(())
    }
}

pub struct SlashTopics;

impl TopicScheme for SlashTopics {
    fn topic(&self, purpose: TopicPurpose, target: &TargetIdentity) -> String {
        format!("device/{target}/{purpose}")
    }
}
