//! Storage abstractions for remote config state.
//!
//! [`Storage`] is the capability every backend implements; [`StorageExt`]
//! layers typed per-field accessors on top of it.

pub mod custom_signals;
pub mod memory;
pub mod persistent;
pub mod types;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::StorageError;
use configs::{AppConfig, BackendKind};
use types::{ConfigValues, CustomSignalUpdate, CustomSignals, FetchResponse, FetchStatus, Settings, ThrottleMetadata};

pub use memory::InMemoryStorage;
pub use persistent::PersistentStorage;

/// The closed set of fields stored per app/namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    ActiveConfig,
    ActiveConfigEtag,
    LastFetchStatus,
    LastSuccessfulFetchTimestampMillis,
    LastSuccessfulFetchResponse,
    Settings,
    ThrottleMetadata,
    CustomSignals,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::ActiveConfig,
        Field::ActiveConfigEtag,
        Field::LastFetchStatus,
        Field::LastSuccessfulFetchTimestampMillis,
        Field::LastSuccessfulFetchResponse,
        Field::Settings,
        Field::ThrottleMetadata,
        Field::CustomSignals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ActiveConfig => "active_config",
            Field::ActiveConfigEtag => "active_config_etag",
            Field::LastFetchStatus => "last_fetch_status",
            Field::LastSuccessfulFetchTimestampMillis => "last_successful_fetch_timestamp_millis",
            Field::LastSuccessfulFetchResponse => "last_successful_fetch_response",
            Field::Settings => "settings",
            Field::ThrottleMetadata => "throttle_metadata",
            Field::CustomSignals => "custom_signals",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Key-value store of remote config fields for one app/namespace.
///
/// Implementations can be database-backed or purely in memory; both must
/// return `Ok(None)` for fields never written.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name for logs, e.g. "persistent" or "memory".
    fn name(&self) -> &'static str;

    async fn get(&self, field: Field) -> Result<Option<Value>, StorageError>;

    async fn set(&self, field: Field, value: Value) -> Result<(), StorageError>;

    async fn delete(&self, field: Field) -> Result<(), StorageError>;

    /// Read the stored signals, merge `signals` into them, validate and
    /// persist, all as one unit of work. Returns the stored result.
    async fn set_custom_signals(&self, signals: CustomSignalUpdate) -> Result<CustomSignals, StorageError>;
}

/// Decode a raw stored value. A stored JSON `null` reads as absent.
pub(crate) fn decode<T: DeserializeOwned>(field: Field, raw: Value) -> Result<Option<T>, StorageError> {
    serde_json::from_value::<Option<T>>(raw).map_err(|e| StorageError::Read(format!("{field}: {e}")))
}

pub(crate) fn encode<T: Serialize + ?Sized>(field: Field, value: &T) -> Result<Value, StorageError> {
    serde_json::to_value(value).map_err(|e| StorageError::Write(format!("{field}: {e}")))
}

async fn get_as<S, T>(storage: &S, field: Field) -> Result<Option<T>, StorageError>
where
    S: Storage + ?Sized,
    T: DeserializeOwned,
{
    match storage.get(field).await? {
        Some(raw) => decode(field, raw),
        None => Ok(None),
    }
}

async fn set_as<S, T>(storage: &S, field: Field, value: &T) -> Result<(), StorageError>
where
    S: Storage + ?Sized,
    T: Serialize + Sync + ?Sized,
{
    let raw = encode(field, value)?;
    storage.set(field, raw).await
}

/// Typed accessors; each field is paired with its value type.
#[async_trait]
pub trait StorageExt: Storage {
    async fn get_active_config(&self) -> Result<Option<ConfigValues>, StorageError> {
        get_as(self, Field::ActiveConfig).await
    }

    async fn set_active_config(&self, config: &ConfigValues) -> Result<(), StorageError> {
        set_as(self, Field::ActiveConfig, config).await
    }

    async fn get_active_config_etag(&self) -> Result<Option<String>, StorageError> {
        get_as(self, Field::ActiveConfigEtag).await
    }

    async fn set_active_config_etag(&self, etag: &str) -> Result<(), StorageError> {
        set_as(self, Field::ActiveConfigEtag, etag).await
    }

    async fn get_last_fetch_status(&self) -> Result<Option<FetchStatus>, StorageError> {
        get_as(self, Field::LastFetchStatus).await
    }

    async fn set_last_fetch_status(&self, status: FetchStatus) -> Result<(), StorageError> {
        set_as(self, Field::LastFetchStatus, &status).await
    }

    async fn get_last_successful_fetch_timestamp_millis(&self) -> Result<Option<i64>, StorageError> {
        get_as(self, Field::LastSuccessfulFetchTimestampMillis).await
    }

    async fn set_last_successful_fetch_timestamp_millis(&self, millis: i64) -> Result<(), StorageError> {
        set_as(self, Field::LastSuccessfulFetchTimestampMillis, &millis).await
    }

    async fn get_last_successful_fetch_response(&self) -> Result<Option<FetchResponse>, StorageError> {
        get_as(self, Field::LastSuccessfulFetchResponse).await
    }

    async fn set_last_successful_fetch_response(&self, response: &FetchResponse) -> Result<(), StorageError> {
        set_as(self, Field::LastSuccessfulFetchResponse, response).await
    }

    async fn get_settings(&self) -> Result<Option<Settings>, StorageError> {
        get_as(self, Field::Settings).await
    }

    async fn set_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        set_as(self, Field::Settings, settings).await
    }

    async fn get_throttle_metadata(&self) -> Result<Option<ThrottleMetadata>, StorageError> {
        get_as(self, Field::ThrottleMetadata).await
    }

    async fn set_throttle_metadata(&self, metadata: &ThrottleMetadata) -> Result<(), StorageError> {
        set_as(self, Field::ThrottleMetadata, metadata).await
    }

    async fn delete_throttle_metadata(&self) -> Result<(), StorageError> {
        self.delete(Field::ThrottleMetadata).await
    }

    async fn get_custom_signals(&self) -> Result<Option<CustomSignals>, StorageError> {
        get_as(self, Field::CustomSignals).await
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

/// Build the backend selected by `cfg`.
///
/// When the database cannot be opened, logs a warning and returns an
/// in-memory store instead, so callers always get a usable storage.
pub async fn open_storage(cfg: &AppConfig) -> Arc<dyn Storage> {
    match cfg.storage.backend {
        BackendKind::Memory => Arc::new(InMemoryStorage::new()),
        BackendKind::Persistent => {
            let storage = PersistentStorage::from_config(cfg);
            match storage.open().await {
                Ok(_) => Arc::new(storage),
                Err(e) => {
                    warn!(error = %e, code = e.code(), "persistent storage unavailable; falling back to memory");
                    Arc::new(InMemoryStorage::new())
                }
            }
        }
    }
}
