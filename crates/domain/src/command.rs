//! Commands sent to devices.
//!
//! Commands are ephemeral: built per call, published once, never stored.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{RelayHubError, ValidationError};
use crate::id::DeviceId;

/// Mode used for slave requests when the caller gives none or an unusable one.
pub const DEFAULT_SLAVE_MODE: i64 = 3;

/// Interpret a JSON value as a number the way loosely-typed clients expect:
/// numbers pass through, numeric strings are parsed, anything else is `None`.
#[must_use]
pub fn coerce_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(number) => Some(number.clone()),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(int) = text.parse::<i64>() {
                return Some(Number::from(int));
            }
            text.parse::<f64>().ok().and_then(Number::from_f64)
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_integer(value: &Value) -> Option<i64> {
    let number = coerce_number(value)?;
    if let Some(int) = number.as_i64() {
        return Some(int);
    }
    number
        .as_f64()
        .filter(|float| float.fract() == 0.0 && float.abs() < 9.0e15)
        .map(|float| float as i64)
}

fn require_device_id(value: Option<&Value>) -> Result<DeviceId, RelayHubError> {
    match value {
        Some(Value::String(text)) => DeviceId::new(text.as_str()),
        Some(Value::Null) | None => Err(ValidationError::MissingField("deviceId").into()),
        Some(_) => Err(ValidationError::InvalidField { field: "deviceId" }.into()),
    }
}

/// A free-form control command addressed to one device.
#[derive(Debug, Clone)]
pub struct ControlCommand {
    pub device_id: DeviceId,
    /// The full request body, published as-is.
    pub payload: Map<String, Value>,
}

impl ControlCommand {
    /// Build a command from a request body carrying a `deviceId` field.
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] when `deviceId` is missing,
    /// empty, or not a string.
    pub fn from_body(body: Map<String, Value>) -> Result<Self, RelayHubError> {
        let device_id = require_device_id(body.get("deviceId"))?;
        Ok(Self {
            device_id,
            payload: body,
        })
    }
}

/// A validated slave request.
#[derive(Debug, Clone, PartialEq)]
pub struct SlaveRequest {
    pub device_id: DeviceId,
    pub sensor_index: u32,
    pub mode: i64,
    pub channel: Option<Number>,
    pub address_low: Value,
    pub address_high: Value,
    pub range: Option<Number>,
    pub capacity: Option<Number>,
    pub slave_id: Option<Value>,
}

impl SlaveRequest {
    /// Create a builder for constructing a [`SlaveRequest`].
    #[must_use]
    pub fn builder() -> SlaveRequestBuilder {
        SlaveRequestBuilder::default()
    }

    /// The payload published on the slave-request topic.
    #[must_use]
    pub fn command(&self) -> SlaveCommand {
        SlaveCommand {
            device_id: self.device_id.clone(),
            sensor_index: self.sensor_index,
            mode: self.mode,
            channel: self.channel.clone(),
            address_low: self.address_low.clone(),
            address_high: self.address_high.clone(),
            range: self.range.clone(),
            capacity: self.capacity.clone(),
            slave_id: self.slave_id.clone(),
        }
    }
}

/// Raw, unvalidated slave-request fields as received from a caller.
#[derive(Debug, Default)]
pub struct SlaveRequestBuilder {
    device_id: Option<Value>,
    sensor_index: Option<Value>,
    mode: Option<Value>,
    channel: Option<Value>,
    address_low: Option<Value>,
    address_high: Option<Value>,
    range: Option<Value>,
    capacity: Option<Value>,
    slave_id: Option<Value>,
}

impl SlaveRequestBuilder {
    #[must_use]
    pub fn device_id(mut self, value: impl Into<Value>) -> Self {
        self.device_id = Some(value.into());
        self
    }

    #[must_use]
    pub fn sensor_index(mut self, value: impl Into<Value>) -> Self {
        self.sensor_index = Some(value.into());
        self
    }

    #[must_use]
    pub fn mode(mut self, value: impl Into<Value>) -> Self {
        self.mode = Some(value.into());
        self
    }

    #[must_use]
    pub fn channel(mut self, value: impl Into<Value>) -> Self {
        self.channel = Some(value.into());
        self
    }

    #[must_use]
    pub fn address_low(mut self, value: impl Into<Value>) -> Self {
        self.address_low = Some(value.into());
        self
    }

    #[must_use]
    pub fn address_high(mut self, value: impl Into<Value>) -> Self {
        self.address_high = Some(value.into());
        self
    }

    #[must_use]
    pub fn range(mut self, value: impl Into<Value>) -> Self {
        self.range = Some(value.into());
        self
    }

    #[must_use]
    pub fn capacity(mut self, value: impl Into<Value>) -> Self {
        self.capacity = Some(value.into());
        self
    }

    #[must_use]
    pub fn slave_id(mut self, value: impl Into<Value>) -> Self {
        self.slave_id = Some(value.into());
        self
    }

    /// Consume the builder, validate, and return a [`SlaveRequest`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayHubError::Validation`] when `deviceId` or
    /// `sensorIndex` is missing, or `sensorIndex` is not a non-negative
    /// integer.
    pub fn build(self) -> Result<SlaveRequest, RelayHubError> {
        let device_id = require_device_id(self.device_id.as_ref())?;
        let sensor_index = match self.sensor_index {
            None | Some(Value::Null) => {
                return Err(ValidationError::MissingField("sensorIndex").into());
            }
            Some(value) => coerce_integer(&value)
                .and_then(|int| u32::try_from(int).ok())
                .ok_or(ValidationError::InvalidField {
                    field: "sensorIndex",
                })?,
        };
        let mode = self
            .mode
            .as_ref()
            .and_then(coerce_integer)
            .unwrap_or(DEFAULT_SLAVE_MODE);

        Ok(SlaveRequest {
            device_id,
            sensor_index,
            mode,
            channel: self.channel.as_ref().and_then(coerce_number),
            address_low: self.address_low.unwrap_or(Value::Null),
            address_high: self.address_high.unwrap_or(Value::Null),
            range: self.range.as_ref().and_then(coerce_number),
            capacity: self.capacity.as_ref().and_then(coerce_number),
            slave_id: self.slave_id.filter(|value| !value.is_null()),
        })
    }
}

/// Wire payload of a slave request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaveCommand {
    pub device_id: DeviceId,
    pub sensor_index: u32,
    pub mode: i64,
    pub channel: Option<Number>,
    pub address_low: Value,
    pub address_high: Value,
    pub range: Option<Number>,
    pub capacity: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slave_id: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_request() -> SlaveRequestBuilder {
        SlaveRequest::builder()
            .device_id("D1")
            .sensor_index(2)
            .mode("1")
            .channel("4")
            .address_low("0x10")
            .address_high("0x00")
            .range(100)
            .capacity("2500.5")
    }

    #[test]
    fn should_coerce_numeric_strings() {
        assert_eq!(coerce_number(&json!("42")), Some(Number::from(42)));
        assert_eq!(coerce_number(&json!(" 7 ")), Some(Number::from(7)));
        assert_eq!(coerce_number(&json!("1.5")), Number::from_f64(1.5));
        assert_eq!(coerce_number(&json!("abc")), None);
        assert_eq!(coerce_number(&json!(null)), None);
        assert_eq!(coerce_number(&json!(true)), None);
    }

    #[test]
    fn should_build_control_command_from_body() {
        let body = json!({"deviceId": "D1", "power": "on"});
        let Value::Object(body) = body else {
            unreachable!()
        };
        let command = ControlCommand::from_body(body).unwrap();
        assert_eq!(command.device_id.as_str(), "D1");
        assert_eq!(command.payload["power"], "on");
    }

    #[test]
    fn should_reject_control_command_without_device_id() {
        let result = ControlCommand::from_body(Map::new());
        assert!(matches!(
            result,
            Err(RelayHubError::Validation(ValidationError::MissingField(
                "deviceId"
            )))
        ));
    }

    #[test]
    fn should_reject_slave_request_without_sensor_index() {
        let result = SlaveRequest::builder().device_id("D1").build();
        assert!(matches!(
            result,
            Err(RelayHubError::Validation(ValidationError::MissingField(
                "sensorIndex"
            )))
        ));
    }

    #[test]
    fn should_reject_negative_sensor_index() {
        let result = SlaveRequest::builder()
            .device_id("D1")
            .sensor_index(-1)
            .build();
        assert!(matches!(
            result,
            Err(RelayHubError::Validation(ValidationError::InvalidField {
                field: "sensorIndex"
            }))
        ));
    }

    #[test]
    fn should_default_mode_when_absent_or_invalid() {
        let absent = SlaveRequest::builder()
            .device_id("D1")
            .sensor_index(0)
            .build()
            .unwrap();
        assert_eq!(absent.mode, DEFAULT_SLAVE_MODE);

        let invalid = SlaveRequest::builder()
            .device_id("D1")
            .sensor_index(0)
            .mode("fast")
            .build()
            .unwrap();
        assert_eq!(invalid.mode, DEFAULT_SLAVE_MODE);
    }

    #[test]
    fn should_coerce_fields_into_command_payload() {
        let request = full_request().build().unwrap();
        let payload = serde_json::to_value(request.command()).unwrap();
        assert_eq!(
            payload,
            json!({
                "deviceId": "D1",
                "sensorIndex": 2,
                "mode": 1,
                "channel": 4,
                "addressLow": "0x10",
                "addressHigh": "0x00",
                "range": 100,
                "capacity": 2500.5,
            })
        );
    }

    #[test]
    fn should_include_slave_id_only_when_given() {
        let request = full_request().slave_id(9).build().unwrap();
        let payload = serde_json::to_value(request.command()).unwrap();
        assert_eq!(payload["slaveId"], 9);
    }

    #[test]
    fn should_null_out_unparseable_channel() {
        let request = full_request().channel("ch-a").build().unwrap();
        assert!(request.channel.is_none());
        let payload = serde_json::to_value(request.command()).unwrap();
        assert!(payload["channel"].is_null());
    }
}
