//! Storage ports: read-only access to the device hierarchy and to the
//! response documents written by devices.

use std::future::Future;
use std::sync::Arc;

use relayhub_domain::device::{DeviceKind, DeviceRecord, SensorMetadata};
use relayhub_domain::error::RelayHubError;
use relayhub_domain::id::{DeviceId, SpaceId};
use relayhub_domain::response::{MatchCriteria, ResponseDocument};
use relayhub_domain::time::Timestamp;

/// Lookups over sensor metadata and device records.
pub trait DeviceDirectory {
    /// Fast-path mapping for `device_id`, if one exists.
    fn find_sensor_metadata(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<SensorMetadata>, RelayHubError>> + Send;

    /// Every device record carrying `device_id`, across all spaces.
    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceRecord>, RelayHubError>> + Send;

    /// The record in `space_id` with the given id and kind.
    fn find_in_space(
        &self,
        space_id: SpaceId,
        device_id: &DeviceId,
        kind: &DeviceKind,
    ) -> impl Future<Output = Result<Option<DeviceRecord>, RelayHubError>> + Send;
}

/// Queryable, time-indexed store of device responses.
pub trait ResponseStore {
    /// The most recently inserted document satisfying `criteria` whose
    /// insertion time is at or after `since`.
    fn find_latest(
        &self,
        criteria: &MatchCriteria,
        since: Timestamp,
    ) -> impl Future<Output = Result<Option<ResponseDocument>, RelayHubError>> + Send;
}

impl<T: DeviceDirectory + Send + Sync> DeviceDirectory for Arc<T> {
    fn find_sensor_metadata(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<SensorMetadata>, RelayHubError>> + Send {
        (**self).find_sensor_metadata(device_id)
    }

    fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Vec<DeviceRecord>, RelayHubError>> + Send {
        (**self).find_by_device_id(device_id)
    }

    fn find_in_space(
        &self,
        space_id: SpaceId,
        device_id: &DeviceId,
        kind: &DeviceKind,
    ) -> impl Future<Output = Result<Option<DeviceRecord>, RelayHubError>> + Send {
        (**self).find_in_space(space_id, device_id, kind)
    }
}

impl<T: ResponseStore + Send + Sync> ResponseStore for Arc<T> {
    fn find_latest(
        &self,
        criteria: &MatchCriteria,
        since: Timestamp,
    ) -> impl Future<Output = Result<Option<ResponseDocument>, RelayHubError>> + Send {
        (**self).find_latest(criteria, since)
    }
}
