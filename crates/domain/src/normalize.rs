//! Response normalizer.
//!
//! Turns store-shaped documents into the canonical shape returned to callers
//! and reconciles the historical spellings of slave-reply fields.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::command::{SlaveRequest, coerce_number};
use crate::response::{MatchKey, RawId, ResponseDocument, ResponseKind};
use crate::time::Timestamp;

const NESTED_RESPONSE: &[&str] = &["response", "Response"];
const STATUS: &[&str] = &["status", "Status", "state"];
const CHANNEL: &[&str] = &["channel", "Channel", "ch"];
const ADDRESS_LOW: &[&str] = &["addressLow", "address_low", "addrLow"];
const ADDRESS_HIGH: &[&str] = &["addressHigh", "address_high", "addrHigh"];
const SENSOR_INDEX: &[&str] = &["sensorIndex", "sensor_index", "sensor"];
const SLAVE_ID: &[&str] = &["slaveId", "slave_id", "slave"];

fn lookup<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|alias| object.get(*alias))
        .find(|value| !value.is_null())
}

/// Printable form of a store-internal identifier.
///
/// Strings pass through, numbers are rendered in decimal, `{"$oid": ..}`
/// wrappers are unwrapped; anything else is rendered as compact JSON.
#[must_use]
pub fn printable_id(raw: &RawId) -> String {
    match &raw.0 {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Object(object) => match object.get("$oid") {
            Some(Value::String(oid)) => oid.clone(),
            _ => raw.0.to_string(),
        },
        other => other.to_string(),
    }
}

/// A response document in the shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalResponse {
    pub id: String,
    #[serde(flatten)]
    pub key: MatchKey,
    #[serde(rename = "messageType")]
    pub kind: ResponseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_index: Option<u32>,
    pub inserted_at: Timestamp,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Replace the store identifier with its printable form; every other field
/// passes through unchanged.
#[must_use]
pub fn normalize(document: ResponseDocument) -> CanonicalResponse {
    CanonicalResponse {
        id: printable_id(&document.id),
        key: document.key,
        kind: document.kind,
        sensor_index: document.sensor_index,
        inserted_at: document.inserted_at,
        payload: document.payload,
    }
}

impl From<CanonicalResponse> for ResponseDocument {
    fn from(value: CanonicalResponse) -> Self {
        Self {
            id: RawId(Value::String(value.id)),
            key: value.key,
            kind: value.kind,
            sensor_index: value.sensor_index,
            inserted_at: value.inserted_at,
            payload: value.payload,
        }
    }
}

/// A slave reply with its fields reconciled against the originating request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaveReply {
    pub id: String,
    pub status: Value,
    pub channel: Option<Number>,
    pub address_low: Value,
    pub address_high: Value,
    pub sensor_index: Value,
    pub slave_id: Value,
    pub inserted_at: Timestamp,
    /// The nested device response, verbatim.
    pub response: Value,
}

impl SlaveReply {
    /// Prefer fields from the nested `response` object of the reply and
    /// fall back to what the request carried.
    #[must_use]
    pub fn reconcile(reply: CanonicalResponse, request: &SlaveRequest) -> Self {
        let nested = lookup(&reply.payload, NESTED_RESPONSE)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let pick = |aliases: &[&str], fallback: Value| {
            lookup(&nested, aliases).cloned().unwrap_or(fallback)
        };

        let channel = lookup(&nested, CHANNEL)
            .and_then(coerce_number)
            .or_else(|| request.channel.clone());

        Self {
            id: reply.id,
            status: pick(STATUS, Value::Null),
            channel,
            address_low: pick(ADDRESS_LOW, request.address_low.clone()),
            address_high: pick(ADDRESS_HIGH, request.address_high.clone()),
            sensor_index: pick(SENSOR_INDEX, Value::from(request.sensor_index)),
            slave_id: pick(
                SLAVE_ID,
                request.slave_id.clone().unwrap_or(Value::Null),
            ),
            inserted_at: reply.inserted_at,
            response: Value::Object(nested),
        }
    }
}
