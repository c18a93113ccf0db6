//! Create `app_namespace_store` table.
//!
//! Single container of remote config records, keyed by the composite
//! `app_id,app_name,namespace,field` string.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AppNamespaceStore::Table)
                    .if_not_exists()
                    .col(string(AppNamespaceStore::CompositeKey).primary_key())
                    .col(text(AppNamespaceStore::Value).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AppNamespaceStore::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum AppNamespaceStore { Table, CompositeKey, Value }
