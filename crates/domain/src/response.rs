//! Response documents written by devices, and the criteria used to find them.
//!
//! Documents are produced by an external writer, keyed by target identity
//! (command replies) or device id (liveness and sensor updates). This crate
//! only ever reads them.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayHubError, ValidationError};
use crate::id::{DeviceId, TargetIdentity};
use crate::time::{self, Timestamp};

/// Recency window for generic command replies.
pub const SLAVE_REPLY_WINDOW: TimeDelta = TimeDelta::seconds(15);
/// Poll cadence for generic command replies.
pub const SLAVE_REPLY_INTERVAL: Duration = Duration::from_millis(500);
/// Recency window for liveness and sensor-update replies.
pub const DEVICE_REPLY_WINDOW: TimeDelta = TimeDelta::seconds(10);
/// Poll cadence for liveness and sensor-update replies.
pub const DEVICE_REPLY_INTERVAL: Duration = Duration::from_millis(1000);

/// Discriminator carried by every response document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseKind {
    #[serde(rename = "slave reply")]
    SlaveReply,
    #[serde(rename = "alive reply")]
    AliveReply,
    #[serde(rename = "update")]
    Update,
}

impl ResponseKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlaveReply => "slave reply",
            Self::AliveReply => "alive reply",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseKind {
    type Err = RelayHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "slave reply" => Ok(Self::SlaveReply),
            "alive reply" => Ok(Self::AliveReply),
            "update" => Ok(Self::Update),
            _ => Err(ValidationError::InvalidField {
                field: "messageType",
            }
            .into()),
        }
    }
}

/// The field a response document is keyed by, with its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchKey {
    TargetIdentity(TargetIdentity),
    DeviceId(DeviceId),
}

impl MatchKey {
    /// Name of the key field (`targetIdentity` or `deviceId`).
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::TargetIdentity(_) => "targetIdentity",
            Self::DeviceId(_) => "deviceId",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::TargetIdentity(target) => target.as_str(),
            Self::DeviceId(device_id) => device_id.as_str(),
        }
    }
}

/// Store-internal identifier of a document, in whatever shape the store
/// uses natively (integer row id, object id, string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawId(pub Value);

/// A device-originated response as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDocument {
    pub id: RawId,
    pub key: MatchKey,
    pub kind: ResponseKind,
    pub sensor_index: Option<u32>,
    pub inserted_at: Timestamp,
    pub payload: Map<String, Value>,
}

impl ResponseDocument {
    /// Create a document stamped with the current time and no store id yet.
    #[must_use]
    pub fn new(key: MatchKey, kind: ResponseKind, payload: Map<String, Value>) -> Self {
        Self {
            id: RawId(Value::Null),
            key,
            kind,
            sensor_index: None,
            inserted_at: time::now(),
            payload,
        }
    }

    #[must_use]
    pub fn with_sensor_index(mut self, sensor_index: u32) -> Self {
        self.sensor_index = Some(sensor_index);
        self
    }

    #[must_use]
    pub fn with_inserted_at(mut self, inserted_at: Timestamp) -> Self {
        self.inserted_at = inserted_at;
        self
    }
}

/// Parameterizes one response-store lookup: which key, which kind, how far
/// back to look, and how often to ask.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCriteria {
    pub key: MatchKey,
    pub kind: ResponseKind,
    pub sensor_index: Option<u32>,
    /// How far back from "now" a document may have been inserted.
    pub window: TimeDelta,
    /// Fixed delay between two lookups.
    pub interval: Duration,
}

impl MatchCriteria {
    /// Reply to a published command, keyed by target identity.
    #[must_use]
    pub fn slave_reply(target: TargetIdentity) -> Self {
        Self {
            key: MatchKey::TargetIdentity(target),
            kind: ResponseKind::SlaveReply,
            sensor_index: None,
            window: SLAVE_REPLY_WINDOW,
            interval: SLAVE_REPLY_INTERVAL,
        }
    }

    /// Liveness reply of a base unit, keyed by device id.
    #[must_use]
    pub fn alive_reply(device_id: DeviceId) -> Self {
        Self {
            key: MatchKey::DeviceId(device_id),
            kind: ResponseKind::AliveReply,
            sensor_index: None,
            window: DEVICE_REPLY_WINDOW,
            interval: DEVICE_REPLY_INTERVAL,
        }
    }

    /// Update pushed by one sensor of a device.
    #[must_use]
    pub fn sensor_update(device_id: DeviceId, sensor_index: u32) -> Self {
        Self {
            key: MatchKey::DeviceId(device_id),
            kind: ResponseKind::Update,
            sensor_index: Some(sensor_index),
            window: DEVICE_REPLY_WINDOW,
            interval: DEVICE_REPLY_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Oldest insertion time still inside the window, relative to `now`.
    #[must_use]
    pub fn since(&self, now: Timestamp) -> Timestamp {
        now - self.window
    }

    /// Whether `document` satisfies these criteria for a lookup made at `since`.
    #[must_use]
    pub fn matches(&self, document: &ResponseDocument, since: Timestamp) -> bool {
        document.key == self.key
            && document.kind == self.kind
            && (self.sensor_index.is_none() || document.sensor_index == self.sensor_index)
            && document.inserted_at >= since
    }
}
