//! `SQLite` implementation of [`DeviceDirectory`].

use std::str::FromStr;

use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use relayhub_app::ports::DeviceDirectory;
use relayhub_domain::device::{DeviceKind, DeviceRecord, SensorMetadata, Space};
use relayhub_domain::error::RelayHubError;
use relayhub_domain::id::{AccountId, DeviceId, SpaceId};

use crate::error::StorageError;

fn decode_attributes(raw: &str) -> Result<Map<String, Value>, sqlx::Error> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
    match value {
        Value::Object(map) => Ok(map),
        // legacy rows sometimes hold `null` instead of an object
        _ => Ok(Map::new()),
    }
}

/// Wrapper for converting database rows into domain [`DeviceRecord`].
struct DeviceRow(DeviceRecord);

impl<'r> FromRow<'r, SqliteRow> for DeviceRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let space_id: String = row.try_get("space_id")?;
        let device_id: String = row.try_get("device_id")?;
        let device_type: String = row.try_get("device_type")?;
        let parent_device_id: Option<String> = row.try_get("parent_device_id")?;
        let attributes: String = row.try_get("attributes")?;

        let space_id =
            SpaceId::from_str(&space_id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let attributes = decode_attributes(&attributes)?;

        let mut builder = DeviceRecord::builder()
            .space_id(space_id)
            .device_id(device_id)
            .kind(device_type)
            .attributes(&attributes);
        if let Some(parent) = parent_device_id {
            builder = builder.parent_id(parent);
        }

        builder
            .build()
            .map(Self)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))
    }
}

struct MetadataRow(SensorMetadata);

impl<'r> FromRow<'r, SqliteRow> for MetadataRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let device_id: String = row.try_get("device_id")?;
        let attributes: String = row.try_get("attributes")?;

        let device_id =
            DeviceId::new(device_id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let attributes = decode_attributes(&attributes)?;

        Ok(Self(SensorMetadata::from_attributes(device_id, &attributes)))
    }
}

const INSERT_ACCOUNT: &str = "INSERT INTO accounts (id, name) VALUES (?, ?)";
const INSERT_SPACE: &str = "INSERT INTO spaces (id, account_id, name) VALUES (?, ?, ?)";
const INSERT_DEVICE: &str = r"
    INSERT INTO devices (space_id, device_id, device_type, parent_device_id, attributes)
    VALUES (?, ?, ?, ?, ?)
";
const UPSERT_SENSOR_METADATA: &str = r"
    INSERT INTO sensor_metadata (device_id, attributes) VALUES (?, ?)
    ON CONFLICT (device_id) DO UPDATE SET attributes = excluded.attributes
";

const SELECT_METADATA: &str = "SELECT * FROM sensor_metadata WHERE device_id = ?";
const SELECT_BY_DEVICE_ID: &str = "SELECT * FROM devices WHERE device_id = ? ORDER BY rowid";
const SELECT_IN_SPACE: &str =
    "SELECT * FROM devices WHERE space_id = ? AND device_id = ? AND device_type = ?";

/// `SQLite`-backed device directory.
#[derive(Clone)]
pub struct SqliteDeviceDirectory {
    pool: SqlitePool,
}

impl SqliteDeviceDirectory {
    /// Create a new directory using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register an account.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the insert fails.
    pub async fn insert_account(&self, id: AccountId, name: &str) -> Result<(), RelayHubError> {
        sqlx::query(INSERT_ACCOUNT)
            .bind(id.to_string())
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Register a space under its owning account.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the insert fails (e.g. unknown account).
    pub async fn insert_space(&self, space: &Space) -> Result<(), RelayHubError> {
        sqlx::query(INSERT_SPACE)
            .bind(space.id.to_string())
            .bind(space.account_id.to_string())
            .bind(&space.name)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Store a device row with its legacy attribute object as-is.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the insert fails.
    pub async fn insert_device(
        &self,
        space_id: SpaceId,
        device_id: &DeviceId,
        kind: &DeviceKind,
        parent_id: Option<&DeviceId>,
        attributes: &Map<String, Value>,
    ) -> Result<(), RelayHubError> {
        let attributes = serde_json::to_string(attributes).map_err(StorageError::from)?;

        sqlx::query(INSERT_DEVICE)
            .bind(space_id.to_string())
            .bind(device_id.as_str())
            .bind(kind.as_str())
            .bind(parent_id.map(DeviceId::as_str))
            .bind(&attributes)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    /// Create or replace the fast-path mapping of a device.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the upsert fails.
    pub async fn upsert_sensor_metadata(
        &self,
        device_id: &DeviceId,
        attributes: &Map<String, Value>,
    ) -> Result<(), RelayHubError> {
        let attributes = serde_json::to_string(attributes).map_err(StorageError::from)?;

        sqlx::query(UPSERT_SENSOR_METADATA)
            .bind(device_id.as_str())
            .bind(&attributes)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

impl DeviceDirectory for SqliteDeviceDirectory {
    async fn find_sensor_metadata(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<SensorMetadata>, RelayHubError> {
        let row: Option<MetadataRow> = sqlx::query_as(SELECT_METADATA)
            .bind(device_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }

    async fn find_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> Result<Vec<DeviceRecord>, RelayHubError> {
        let rows: Vec<DeviceRow> = sqlx::query_as(SELECT_BY_DEVICE_ID)
            .bind(device_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn find_in_space(
        &self,
        space_id: SpaceId,
        device_id: &DeviceId,
        kind: &DeviceKind,
    ) -> Result<Option<DeviceRecord>, RelayHubError> {
        let row: Option<DeviceRow> = sqlx::query_as(SELECT_IN_SPACE)
            .bind(space_id.to_string())
            .bind(device_id.as_str())
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|r| r.0))
    }
}
