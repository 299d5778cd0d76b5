//! Typed identifier newtypes.
//!
//! Ownership identifiers (`SpaceId`, `AccountId`) are backed by UUIDs.
//! Device-facing identifiers (`DeviceId`, `TargetIdentity`) are opaque,
//! caller-supplied strings and must never be empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RelayHubError, ValidationError};

macro_rules! define_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl Default for $name {
            fn default() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Access the inner UUID.
            #[must_use]
            pub fn as_uuid(self) -> uuid::Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }
    };
}

macro_rules! define_name {
    ($(#[doc = $doc:expr])* $name:ident, $field:literal) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Wrap a non-empty string.
            ///
            /// # Errors
            ///
            /// Returns [`RelayHubError::Validation`] when `value` is empty
            /// or only whitespace.
            pub fn new(value: impl Into<String>) -> Result<Self, RelayHubError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(ValidationError::MissingField($field).into());
                }
                Ok(Self(value))
            }

            /// Borrow the inner string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = RelayHubError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = RelayHubError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

define_id!(
    /// Unique identifier for a [`Space`](crate::device::Space).
    SpaceId
);

define_id!(
    /// Unique identifier for the account owning a space.
    AccountId
);

define_name!(
    /// Caller-supplied identifier of a physical unit.
    ///
    /// Not unique across device kinds: the same id may appear in several spaces.
    DeviceId,
    "deviceId"
);

define_name!(
    /// Routable name of a device on the messaging fabric.
    TargetIdentity,
    "targetIdentity"
);
