use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::StorageError;
use crate::storage::custom_signals::{merge_custom_signals, validate_signal_update};
use crate::storage::types::{CustomSignalUpdate, CustomSignals};
use crate::storage::{decode, encode, Field, Storage};

/// Process-memory storage for environments without a database.
///
/// Keys are bare field names; each instance is its own scope and nothing
/// survives the process.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<RwLock<HashMap<Field, Value>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self { Self::default() }

    /// Number of fields currently holding a value.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    fn name(&self) -> &'static str { "memory" }

    async fn get(&self, field: Field) -> Result<Option<Value>, StorageError> {
        let map = self.inner.read().await;
        Ok(map.get(&field).cloned())
    }

    async fn set(&self, field: Field, value: Value) -> Result<(), StorageError> {
        let mut map = self.inner.write().await;
        map.insert(field, value);
        Ok(())
    }

    async fn delete(&self, field: Field) -> Result<(), StorageError> {
        let mut map = self.inner.write().await;
        map.remove(&field);
        Ok(())
    }

    async fn set_custom_signals(&self, signals: CustomSignalUpdate) -> Result<CustomSignals, StorageError> {
        validate_signal_update(&signals)?;
        // write lock held across read-merge-write
        let mut map = self.inner.write().await;
        let stored: CustomSignals = match map.get(&Field::CustomSignals) {
            Some(raw) => decode(Field::CustomSignals, raw.clone())?.unwrap_or_default(),
            None => CustomSignals::new(),
        };
        let merged = merge_custom_signals(&signals, &stored)?;
        map.insert(Field::CustomSignals, encode(Field::CustomSignals, &merged)?);
        drop(map);

        debug!(stored = merged.len(), "custom signals updated");
        Ok(merged)
    }
}
