use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use configs::{AppConfig, DatabaseConfig};
use models::app_namespace_store as records;

use crate::errors::StorageError;
use crate::storage::custom_signals::{merge_custom_signals, validate_signal_update};
use crate::storage::types::{CustomSignalUpdate, CustomSignals};
use crate::storage::{decode, encode, Field, Storage};

/// Database-backed storage scoped to one (app id, app name, namespace).
///
/// The connection is opened and migrated on first use and shared by every
/// later call. Many instances may share one database; their records never
/// overlap because every key is prefixed with the instance scope.
pub struct PersistentStorage {
    app_id: String,
    app_name: String,
    namespace: String,
    database: DatabaseConfig,
    db: OnceCell<DatabaseConnection>,
}

impl PersistentStorage {
    pub fn new(app_id: &str, app_name: &str, namespace: &str, database: DatabaseConfig) -> Self {
        Self {
            app_id: app_id.to_string(),
            app_name: app_name.to_string(),
            namespace: namespace.to_string(),
            database,
            db: OnceCell::new(),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        let mut database = cfg.database.clone();
        database.normalize_from_env();
        Self::new(&cfg.storage.app_id, &cfg.storage.app_name, &cfg.storage.namespace, database)
    }

    /// Whether a database at `cfg` can be reached at all.
    pub async fn is_available(cfg: &DatabaseConfig) -> bool {
        match models::db::connect_with_config(cfg).await {
            Ok(db) => db.ping().await.is_ok(),
            Err(e) => {
                debug!(error = %e, "database probe failed");
                false
            }
        }
    }

    /// Open (connect and migrate) once; later calls reuse the handle.
    /// A failed open is not cached, the next call tries again.
    pub async fn open(&self) -> Result<&DatabaseConnection, StorageError> {
        self.db
            .get_or_try_init(|| async {
                models::db::connect_and_migrate(&self.database)
                    .await
                    .map_err(|e| StorageError::Open(e.to_string()))
            })
            .await
    }

    fn key(&self, field: Field) -> String {
        records::composite_key(&self.app_id, &self.app_name, &self.namespace, field.as_str())
    }
}

fn parse(field: Field, raw: &str) -> Result<Value, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Read(format!("{field}: {e}")))
}

#[async_trait]
impl Storage for PersistentStorage {
    fn name(&self) -> &'static str { "persistent" }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn get(&self, field: Field) -> Result<Option<Value>, StorageError> {
        let db = self.open().await?;
        let raw = records::find_value(db, &self.key(field))
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?;
        raw.map(|r| parse(field, &r)).transpose()
    }

    #[instrument(skip(self, value), fields(namespace = %self.namespace))]
    async fn set(&self, field: Field, value: Value) -> Result<(), StorageError> {
        let db = self.open().await?;
        records::upsert_value(db, &self.key(field), value.to_string())
            .await
            .map_err(|e| StorageError::Write(e.to_string()))
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn delete(&self, field: Field) -> Result<(), StorageError> {
        let db = self.open().await?;
        records::delete_value(db, &self.key(field))
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Delete(e.to_string()))
    }

    #[instrument(skip(self, signals), fields(namespace = %self.namespace, changes = signals.len()))]
    async fn set_custom_signals(&self, signals: CustomSignalUpdate) -> Result<CustomSignals, StorageError> {
        validate_signal_update(&signals)?;
        let db = self.open().await?;
        let key = self.key(Field::CustomSignals);

        // read and write in one transaction; dropping it on error rolls back.
        // The placeholder write comes first so the transaction holds the write
        // lock (SQLite) and a lockable row (PostgreSQL) before reading.
        let txn = db.begin().await.map_err(|e| StorageError::Write(e.to_string()))?;
        records::insert_value_if_absent(&txn, &key, "{}".to_string())
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;
        let stored: CustomSignals = match records::find_value_for_update(&txn, &key)
            .await
            .map_err(|e| StorageError::Read(e.to_string()))?
        {
            Some(raw) => decode(Field::CustomSignals, parse(Field::CustomSignals, &raw)?)?.unwrap_or_default(),
            None => CustomSignals::new(),
        };

        let merged = match merge_custom_signals(&signals, &stored) {
            Ok(merged) => merged,
            Err(e) => {
                txn.rollback().await.map_err(|e| StorageError::Write(e.to_string()))?;
                return Err(e);
            }
        };
        let raw = encode(Field::CustomSignals, &merged)?;
        records::upsert_value(&txn, &key, raw.to_string())
            .await
            .map_err(|e| StorageError::Write(e.to_string()))?;
        txn.commit().await.map_err(|e| StorageError::Write(e.to_string()))?;

        debug!(stored = merged.len(), "custom signals updated");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::{SignalValue, ThrottleMetadata};
    use crate::storage::StorageExt;
    use crate::test_support::{memory_database, persistent_storage};
    use std::sync::Arc;

    #[tokio::test]
    async fn open_runs_once() -> anyhow::Result<()> {
        let storage = persistent_storage("firebase");
        let first = storage.open().await?;
        let second = storage.open().await?;
        assert!(std::ptr::eq(first, second));
        Ok(())
    }

    #[tokio::test]
    async fn unwritten_field_is_absent() -> anyhow::Result<()> {
        let storage = persistent_storage("firebase");
        for field in Field::ALL {
            assert_eq!(storage.get(field).await?, None, "{field}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn throttle_metadata_roundtrip_and_delete() -> anyhow::Result<()> {
        let storage = persistent_storage("firebase");
        let meta = ThrottleMetadata { backoff_count: 3, throttle_end_time_millis: 1_700_000_123_000 };

        storage.set_throttle_metadata(&meta).await?;
        assert_eq!(storage.get_throttle_metadata().await?, Some(meta));

        storage.delete_throttle_metadata().await?;
        assert_eq!(storage.get_throttle_metadata().await?, None);
        // deleting again is not an error
        storage.delete_throttle_metadata().await?;
        Ok(())
    }

    #[tokio::test]
    async fn custom_signals_merge_in_transaction() -> anyhow::Result<()> {
        let storage = persistent_storage("firebase");
        storage
            .set_custom_signals(CustomSignalUpdate::from([
                ("a".to_string(), Some(SignalValue::from("1"))),
                ("b".to_string(), Some(SignalValue::from("2"))),
            ]))
            .await?;

        let merged = storage
            .set_custom_signals(CustomSignalUpdate::from([
                ("b".to_string(), None),
                ("c".to_string(), Some(SignalValue::from(3i64))),
            ]))
            .await?;

        let expected = CustomSignals::from([("a".to_string(), "1".to_string()), ("c".to_string(), "3".to_string())]);
        assert_eq!(merged, expected);
        assert_eq!(storage.get_custom_signals().await?, Some(expected));
        Ok(())
    }

    #[tokio::test]
    async fn over_limit_leaves_stored_signals_untouched() -> anyhow::Result<()> {
        let storage = persistent_storage("firebase");
        let initial = CustomSignalUpdate::from([("keep".to_string(), Some(SignalValue::from("me")))]);
        storage.set_custom_signals(initial).await?;

        let too_many: CustomSignalUpdate = (0..crate::storage::custom_signals::RC_CUSTOM_SIGNAL_MAX_ALLOWED_COUNT)
            .map(|i| (format!("s{i}"), Some(SignalValue::from(i as i64))))
            .collect();
        let err = storage.set_custom_signals(too_many).await.unwrap_err();
        assert_eq!(err.code(), "custom-signal-max-allowed-signals");

        let stored = storage.get_custom_signals().await?;
        assert_eq!(stored, Some(CustomSignals::from([("keep".to_string(), "me".to_string())])));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signal_updates_on_one_connection() -> anyhow::Result<()> {
        let storage = Arc::new(persistent_storage("firebase"));
        storage.open().await?;

        let mut handles = Vec::new();
        for i in 0..16 {
            let s = storage.clone();
            handles.push(tokio::spawn(async move {
                let update = CustomSignalUpdate::from([(format!("k{i}"), Some(SignalValue::from(i as i64)))]);
                s.set_custom_signals(update).await
            }));
        }
        for h in handles {
            h.await??;
        }

        let stored = storage.get_custom_signals().await?.unwrap_or_default();
        assert_eq!(stored.len(), 16);
        for i in 0..16 {
            assert_eq!(stored.get(&format!("k{i}")), Some(&i.to_string()));
        }
        Ok(())
    }

    #[tokio::test]
    async fn open_failure_is_open_error() {
        let missing = std::env::temp_dir().join(format!("rc_open_{}", uuid::Uuid::new_v4())).join("rc.db");
        let database = DatabaseConfig {
            url: format!("sqlite://{}?mode=ro", missing.display()),
            connect_timeout_secs: 1,
            acquire_timeout_secs: 1,
            ..memory_database()
        };
        let storage = PersistentStorage::new("app", "[DEFAULT]", "firebase", database);
        let err = storage.get(Field::Settings).await.unwrap_err();
        assert_eq!(err.code(), "storage-open");
    }

    #[tokio::test]
    async fn probe_reports_reachable_database() {
        assert!(PersistentStorage::is_available(&memory_database()).await);
    }
}
