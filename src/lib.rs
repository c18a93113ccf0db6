//! Per-app, per-namespace remote config storage.
//!
//! Re-exports the storage API and wires configuration to a ready backend.

use std::sync::Arc;

use tracing::info;

pub use configs::{AppConfig, BackendKind, DatabaseConfig, StorageConfig};
pub use service::errors::StorageError;
pub use service::storage::custom_signals::{
    merge_custom_signals, RC_CUSTOM_SIGNAL_KEY_MAX_LENGTH, RC_CUSTOM_SIGNAL_MAX_ALLOWED_COUNT,
    RC_CUSTOM_SIGNAL_VALUE_MAX_LENGTH,
};
pub use service::storage::types::{
    ConfigValues, CustomSignalUpdate, CustomSignals, FetchResponse, FetchStatus, SignalValue, Settings,
    ThrottleMetadata,
};
pub use service::storage::{open_storage, Field, InMemoryStorage, PersistentStorage, Storage, StorageExt};

/// Storage for `app_id` with default app name and namespace; the database
/// URL comes from `REMOTE_CONFIG_DATABASE_URL` or defaults to in-memory SQLite.
pub async fn open_for_app(app_id: &str) -> anyhow::Result<Arc<dyn Storage>> {
    let cfg = AppConfig::for_app(app_id)?;
    Ok(open_with_config(&cfg).await)
}

/// Storage described by the file at `CONFIG_PATH` (default `remote_config.toml`).
pub async fn open_from_config_file() -> anyhow::Result<Arc<dyn Storage>> {
    let cfg = AppConfig::load_and_validate()?;
    Ok(open_with_config(&cfg).await)
}

async fn open_with_config(cfg: &AppConfig) -> Arc<dyn Storage> {
    let storage = open_storage(cfg).await;
    info!(
        backend = storage.name(),
        app_name = %cfg.storage.app_name,
        namespace = %cfg.storage.namespace,
        "remote config storage ready"
    );
    storage
}

/// Install the default stdout tracing subscriber; a no-op if one is already set.
pub fn init_logging() {
    common::utils::logging::init_logging_default();
}

/// Install the JSON tracing subscriber for log shippers; a no-op if one is already set.
pub fn init_json_logging() {
    common::utils::logging::init_logging_json();
}
