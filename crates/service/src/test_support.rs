#![cfg(test)]
use std::sync::Once;

use configs::DatabaseConfig;

use crate::storage::PersistentStorage;

static LOGGING: Once = Once::new();

/// Route tracing output through the test harness, once per test binary.
pub fn init_test_logging() {
    LOGGING.call_once(common::utils::logging::init_logging_test);
}

/// Single-connection in-memory SQLite; every call is a fresh database.
pub fn memory_database() -> DatabaseConfig {
    let mut cfg = DatabaseConfig { url: "sqlite::memory:".into(), ..DatabaseConfig::default() };
    cfg.normalize_from_env();
    cfg
}

/// Unopened persistent storage on its own in-memory database.
pub fn persistent_storage(namespace: &str) -> PersistentStorage {
    init_test_logging();
    PersistentStorage::new("1:1234567890:web:abcdef", "[DEFAULT]", namespace, memory_database())
}
