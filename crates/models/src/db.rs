use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{debug, info};

use configs::DatabaseConfig;
use migration::MigratorTrait;

/// Logical name of the remote config database.
pub const DB_NAME: &str = "firebase_remote_config";
/// Schema version this build migrates to.
pub const DB_VERSION: usize = migration::SCHEMA_VERSION;
/// Table holding every app/namespace record.
pub const APP_NAMESPACE_STORE: &str = "app_namespace_store";

pub async fn connect_with_config(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    common::env::ensure_database_dir(&cfg.url).await?;
    let url = with_create_mode(&cfg.url);
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .sqlx_logging(cfg.sqlx_logging);
    let db = Database::connect(opt).await?;
    debug!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}

/// Connect and bring the schema up to [`DB_VERSION`]. Already-applied
/// migrations are skipped, so this is safe on every open.
pub async fn connect_and_migrate(cfg: &DatabaseConfig) -> anyhow::Result<DatabaseConnection> {
    let db = connect_with_config(cfg).await?;
    let pending = migration::Migrator::get_pending_migrations(&db).await?.len();
    if pending > 0 {
        info!(db = DB_NAME, pending, target_version = DB_VERSION, "applying schema migrations");
        migration::Migrator::up(&db, None).await?;
    }
    Ok(db)
}

// sqlx refuses to create a missing SQLite file unless asked to.
fn with_create_mode(url: &str) -> String {
    if common::env::sqlite_file_path(url).is_none() || url.contains("mode=") {
        return url.to_string();
    }
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}mode=rwc")
}
