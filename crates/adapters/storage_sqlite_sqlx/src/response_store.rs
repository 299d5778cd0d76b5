//! `SQLite` implementation of [`ResponseStore`].

use std::str::FromStr;

use chrono::SecondsFormat;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use relayhub_app::ports::ResponseStore;
use relayhub_domain::error::RelayHubError;
use relayhub_domain::id::{DeviceId, TargetIdentity};
use relayhub_domain::response::{MatchCriteria, MatchKey, RawId, ResponseDocument, ResponseKind};
use relayhub_domain::time::Timestamp;

use crate::error::StorageError;

/// Fixed-width RFC 3339 so that text comparison orders like time.
fn format_timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

/// Wrapper for converting database rows into domain [`ResponseDocument`].
struct Wrapper(ResponseDocument);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: i64 = row.try_get("id")?;
        let key_field: String = row.try_get("key_field")?;
        let key_value: String = row.try_get("key_value")?;
        let message_type: String = row.try_get("message_type")?;
        let sensor_index: Option<i64> = row.try_get("sensor_index")?;
        let inserted_at: String = row.try_get("inserted_at")?;
        let payload: String = row.try_get("payload")?;

        let key = match key_field.as_str() {
            "targetIdentity" => {
                MatchKey::TargetIdentity(TargetIdentity::new(key_value).map_err(decode)?)
            }
            "deviceId" => MatchKey::DeviceId(DeviceId::new(key_value).map_err(decode)?),
            other => {
                return Err(sqlx::Error::Decode(
                    format!("unknown response key field: {other}").into(),
                ));
            }
        };
        let kind = ResponseKind::from_str(&message_type).map_err(decode)?;
        let sensor_index = sensor_index
            .map(u32::try_from)
            .transpose()
            .map_err(decode)?;
        let inserted_at = chrono::DateTime::parse_from_rfc3339(&inserted_at)
            .map_err(decode)?
            .to_utc();
        let payload = match serde_json::from_str::<Value>(&payload).map_err(decode)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Ok(Self(ResponseDocument {
            id: RawId(Value::from(id)),
            key,
            kind,
            sensor_index,
            inserted_at,
            payload,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO responses (key_field, key_value, message_type, sensor_index, inserted_at, payload)
    VALUES (?, ?, ?, ?, ?, ?)
";

const SELECT_LATEST: &str = r"
    SELECT * FROM responses
    WHERE key_field = ? AND key_value = ? AND message_type = ?
      AND (? IS NULL OR sensor_index = ?)
      AND inserted_at >= ?
    ORDER BY inserted_at DESC, id DESC
    LIMIT 1
";

/// `SQLite`-backed response store.
#[derive(Clone)]
pub struct SqliteResponseStore {
    pool: SqlitePool,
}

impl SqliteResponseStore {
    /// Create a new store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a response document, as a device-side producer would.
    ///
    /// Returns the document with its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if serialization or the insert fails.
    pub async fn insert(
        &self,
        document: ResponseDocument,
    ) -> Result<ResponseDocument, RelayHubError> {
        let payload = serde_json::to_string(&document.payload).map_err(StorageError::from)?;

        let result = sqlx::query(INSERT)
            .bind(document.key.field())
            .bind(document.key.value())
            .bind(document.kind.as_str())
            .bind(document.sensor_index.map(i64::from))
            .bind(format_timestamp(document.inserted_at))
            .bind(&payload)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(ResponseDocument {
            id: RawId(Value::from(result.last_insert_rowid())),
            ..document
        })
    }
}

impl ResponseStore for SqliteResponseStore {
    async fn find_latest(
        &self,
        criteria: &MatchCriteria,
        since: Timestamp,
    ) -> Result<Option<ResponseDocument>, RelayHubError> {
        let sensor_index = criteria.sensor_index.map(i64::from);
        let row: Option<Wrapper> = sqlx::query_as(SELECT_LATEST)
            .bind(criteria.key.field())
            .bind(criteria.key.value())
            .bind(criteria.kind.as_str())
            .bind(sensor_index)
            .bind(sensor_index)
            .bind(format_timestamp(since))
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use chrono::TimeDelta;
    use relayhub_domain::time;
    use serde_json::json;

    async fn setup() -> SqliteResponseStore {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteResponseStore::new(db.pool().clone())
    }

    fn target() -> TargetIdentity {
        TargetIdentity::new("T0").unwrap()
    }

    fn reply(value: i64, age_secs: i64) -> ResponseDocument {
        let mut payload = Map::new();
        payload.insert("value".to_string(), json!(value));
        ResponseDocument::new(
            MatchKey::TargetIdentity(target()),
            ResponseKind::SlaveReply,
            payload,
        )
        .with_inserted_at(time::now() - TimeDelta::seconds(age_secs))
    }

    fn lookup_since(criteria: &MatchCriteria) -> Timestamp {
        criteria.since(time::now())
    }

    #[tokio::test]
    async fn should_assign_ids_on_insert() {
        let store = setup().await;
        let first = store.insert(reply(1, 0)).await.unwrap();
        let second = store.insert(reply(2, 0)).await.unwrap();
        assert_eq!(first.id, RawId(json!(1)));
        assert_eq!(second.id, RawId(json!(2)));
    }

    #[tokio::test]
    async fn should_return_most_recent_document_in_window() {
        let store = setup().await;
        store.insert(reply(1, 6)).await.unwrap();
        store.insert(reply(2, 1)).await.unwrap();
        store.insert(reply(3, 3)).await.unwrap();

        let criteria = MatchCriteria::slave_reply(target());
        let found = store
            .find_latest(&criteria, lookup_since(&criteria))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.payload["value"], 2);
        assert_eq!(found.key, MatchKey::TargetIdentity(target()));
        assert_eq!(found.kind, ResponseKind::SlaveReply);
    }

    #[tokio::test]
    async fn should_ignore_documents_older_than_window() {
        let store = setup().await;
        store.insert(reply(1, 20)).await.unwrap();

        let criteria = MatchCriteria::slave_reply(target());
        let found = store
            .find_latest(&criteria, lookup_since(&criteria))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn should_filter_on_key_kind_and_sensor_index() {
        let store = setup().await;
        let device = DeviceId::new("X").unwrap();
        store
            .insert(
                ResponseDocument::new(
                    MatchKey::DeviceId(device.clone()),
                    ResponseKind::Update,
                    Map::new(),
                )
                .with_sensor_index(1),
            )
            .await
            .unwrap();
        store
            .insert(ResponseDocument::new(
                MatchKey::DeviceId(device.clone()),
                ResponseKind::AliveReply,
                Map::new(),
            ))
            .await
            .unwrap();

        let sensor_one = MatchCriteria::sensor_update(device.clone(), 1);
        let sensor_two = MatchCriteria::sensor_update(device.clone(), 2);
        let alive = MatchCriteria::alive_reply(device);
        let other = MatchCriteria::alive_reply(DeviceId::new("Y").unwrap());

        let find = |criteria: MatchCriteria| {
            let store = store.clone();
            async move {
                let since = lookup_since(&criteria);
                store.find_latest(&criteria, since).await.unwrap()
            }
        };

        assert_eq!(find(sensor_one).await.unwrap().sensor_index, Some(1));
        assert!(find(sensor_two).await.is_none());
        assert_eq!(find(alive).await.unwrap().kind, ResponseKind::AliveReply);
        assert!(find(other).await.is_none());
    }

    #[tokio::test]
    async fn should_roundtrip_insertion_timestamp() {
        let store = setup().await;
        let inserted = store.insert(reply(1, 0)).await.unwrap();

        let criteria = MatchCriteria::slave_reply(target());
        let found = store
            .find_latest(&criteria, lookup_since(&criteria))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            found.inserted_at.timestamp_micros(),
            inserted.inserted_at.timestamp_micros()
        );
    }
}
