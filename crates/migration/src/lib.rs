//! Migrator for the remote config store.
//!
//! Migrations are applied in list order and each one exactly once; a database
//! several versions behind runs every intermediate step in a single `up`.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_app_namespace_store;

/// Schema version reached after every migration below has been applied.
pub const SCHEMA_VERSION: usize = 1;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_app_namespace_store::Migration),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm_migration::sea_orm::{ConnectOptions, Database, DatabaseConnection};

    // one connection, otherwise each pooled connection sees its own empty memory db
    async fn memory_db() -> Result<DatabaseConnection, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        Database::connect(opt).await
    }

    #[test]
    fn migration_list_matches_schema_version() {
        assert_eq!(Migrator::migrations().len(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn up_creates_store_once() -> anyhow::Result<()> {
        let db = memory_db().await?;
        Migrator::up(&db, None).await?;

        let manager = SchemaManager::new(&db);
        assert!(manager.has_table("app_namespace_store").await?);
        assert_eq!(Migrator::get_applied_migrations(&db).await?.len(), 1);

        // already at the latest version: nothing left to apply
        assert!(Migrator::get_pending_migrations(&db).await?.is_empty());
        Migrator::up(&db, None).await?;
        assert_eq!(Migrator::get_applied_migrations(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn down_drops_store() -> anyhow::Result<()> {
        let db = memory_db().await?;
        Migrator::up(&db, None).await?;
        Migrator::down(&db, None).await?;
        let manager = SchemaManager::new(&db);
        assert!(!manager.has_table("app_namespace_store").await?);
        Ok(())
    }
}
