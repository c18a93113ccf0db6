

use configs::DatabaseConfig;
use sea_orm::DatabaseConnection;

/// Fresh, migrated in-memory database for a single test.
pub(crate) async fn setup_test_db() -> anyhow::Result<DatabaseConnection> {
    let mut cfg = DatabaseConfig { url: "sqlite::memory:".into(), ..DatabaseConfig::default() };
    cfg.normalize_from_env();
    crate::db::connect_and_migrate(&cfg).await
}
