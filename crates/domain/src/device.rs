//! Device records, the space hierarchy they live in, and sensor metadata.
//!
//! A dependent device has no target identity of its own; it borrows the one
//! of its `independent` parent in the same space.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RelayHubError, ValidationError};
use crate::id::{AccountId, DeviceId, SpaceId, TargetIdentity};

/// Legacy spellings of the target-identity field, highest priority first.
pub const TARGET_IDENTITY_ALIASES: &[&str] = &[
    "thingName",
    "thing_name",
    "iotThingName",
    "iot_thing_name",
    "thing",
];

/// Pick the canonical target identity out of a legacy attribute object.
///
/// Aliases are consulted in [`TARGET_IDENTITY_ALIASES`] order and the first
/// non-empty string wins.
#[must_use]
pub fn target_identity_from_aliases(attributes: &Map<String, Value>) -> Option<TargetIdentity> {
    TARGET_IDENTITY_ALIASES
        .iter()
        .filter_map(|alias| attributes.get(*alias))
        .filter_map(Value::as_str)
        .find_map(|value| TargetIdentity::new(value).ok())
}

/// Discriminates how a device is addressed on the messaging fabric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceKind {
    /// Owns a target identity.
    Independent,
    /// Reached through its parent's target identity.
    Dependent,
    /// Any other device type; may carry a target identity directly.
    Other(String),
}

impl DeviceKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Independent => "independent",
            Self::Dependent => "dependent",
            Self::Other(value) => value,
        }
    }
}

impl From<&str> for DeviceKind {
    fn from(value: &str) -> Self {
        match value {
            "independent" => Self::Independent,
            "dependent" => Self::Dependent,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for DeviceKind {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<DeviceKind> for String {
    fn from(value: DeviceKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A container of devices owned by an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub account_id: AccountId,
    pub name: String,
}

impl Space {
    /// Create a new space with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] when `name` is empty.
    pub fn new(account_id: AccountId, name: impl Into<String>) -> Result<Self, RelayHubError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        Ok(Self {
            id: SpaceId::new(),
            account_id,
            name,
        })
    }
}

/// A device as stored in the space hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub space_id: SpaceId,
    pub device_id: DeviceId,
    pub kind: DeviceKind,
    /// Parent device id; only meaningful for [`DeviceKind::Dependent`].
    pub parent_id: Option<DeviceId>,
    /// Canonical target identity, already resolved from legacy aliases.
    pub target_identity: Option<TargetIdentity>,
}

impl DeviceRecord {
    /// Create a builder for constructing a [`DeviceRecord`].
    #[must_use]
    pub fn builder() -> DeviceRecordBuilder {
        DeviceRecordBuilder::default()
    }
}

/// Step-by-step builder for [`DeviceRecord`].
#[derive(Debug, Default)]
pub struct DeviceRecordBuilder {
    space_id: Option<SpaceId>,
    device_id: Option<String>,
    kind: Option<DeviceKind>,
    parent_id: Option<String>,
    target_identity: Option<TargetIdentity>,
}

impl DeviceRecordBuilder {
    #[must_use]
    pub fn space_id(mut self, space_id: SpaceId) -> Self {
        self.space_id = Some(space_id);
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<DeviceKind>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn target_identity(mut self, target: TargetIdentity) -> Self {
        self.target_identity = Some(target);
        self
    }

    /// Resolve the target identity from a legacy attribute object.
    ///
    /// Leaves any previously set identity untouched when no alias matches.
    #[must_use]
    pub fn attributes(mut self, attributes: &Map<String, Value>) -> Self {
        if let Some(target) = target_identity_from_aliases(attributes) {
            self.target_identity = Some(target);
        }
        self
    }

    /// Consume the builder, validate, and return a [`DeviceRecord`].
    ///
    /// An empty parent reference is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] when the space, device id or
    /// kind is missing.
    pub fn build(self) -> Result<DeviceRecord, RelayHubError> {
        let space_id = self
            .space_id
            .ok_or(ValidationError::MissingField("spaceId"))?;
        let device_id = DeviceId::new(self.device_id.unwrap_or_default())?;
        let kind = self.kind.ok_or(ValidationError::MissingField("deviceType"))?;
        let parent_id = self.parent_id.and_then(|value| DeviceId::new(value).ok());

        Ok(DeviceRecord {
            space_id,
            device_id,
            kind,
            parent_id,
            target_identity: self.target_identity,
        })
    }
}

/// Fast-path mapping from a device id straight to its target identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorMetadata {
    pub device_id: DeviceId,
    pub target_identity: Option<TargetIdentity>,
}

impl SensorMetadata {
    /// Build from a legacy attribute object, applying the alias list.
    #[must_use]
    pub fn from_attributes(device_id: DeviceId, attributes: &Map<String, Value>) -> Self {
        Self {
            device_id,
            target_identity: target_identity_from_aliases(attributes),
        }
    }
}
