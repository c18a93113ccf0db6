use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, QuerySelect, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Separator between the parts of a composite key.
pub const KEY_DELIMITER: &str = ",";

/// One remote config field of one app/namespace; `value` holds JSON text.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "app_namespace_store")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub composite_key: String,
    #[sea_orm(column_type = "Text")]
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef { panic!("no relations defined here") }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn composite_key(app_id: &str, app_name: &str, namespace: &str, field: &str) -> String {
    [app_id, app_name, namespace, field].join(KEY_DELIMITER)
}

pub async fn find_value<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<String>, ModelError> {
    let row = Entity::find_by_id(key.to_string()).one(db).await?;
    Ok(row.map(|m| m.value))
}

/// Like [`find_value`], but takes a row lock for the rest of the surrounding
/// transaction on backends that support it. SQLite ignores the lock clause.
pub async fn find_value_for_update<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<String>, ModelError> {
    let row = Entity::find_by_id(key.to_string()).lock_exclusive().one(db).await?;
    Ok(row.map(|m| m.value))
}

/// Insert `placeholder` for `key` unless a record already exists.
///
/// Run first inside a transaction this takes the write lock on SQLite and
/// guarantees a row for a following [`find_value_for_update`] to lock on
/// PostgreSQL. Returns whether a row was inserted.
pub async fn insert_value_if_absent<C: ConnectionTrait>(db: &C, key: &str, placeholder: String) -> Result<bool, ModelError> {
    if key.is_empty() { return Err(ModelError::Validation("composite key required".into())); }
    let am = ActiveModel { composite_key: Set(key.to_string()), value: Set(placeholder) };
    let inserted = Entity::insert(am)
        .on_conflict(OnConflict::column(Column::CompositeKey).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

pub async fn upsert_value<C: ConnectionTrait>(db: &C, key: &str, value: String) -> Result<(), ModelError> {
    if key.is_empty() { return Err(ModelError::Validation("composite key required".into())); }
    let am = ActiveModel { composite_key: Set(key.to_string()), value: Set(value) };
    Entity::insert(am)
        .on_conflict(OnConflict::column(Column::CompositeKey).update_column(Column::Value).to_owned())
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Remove a record; returns whether it existed.
pub async fn delete_value<C: ConnectionTrait>(db: &C, key: &str) -> Result<bool, ModelError> {
    let res = Entity::delete_by_id(key.to_string()).exec(db).await?;
    Ok(res.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_key_joins_all_parts() {
        let key = composite_key("1:123:web:abc", "[DEFAULT]", "firebase", "active_config");
        assert_eq!(key, "1:123:web:abc,[DEFAULT],firebase,active_config");
    }

    #[test]
    fn composite_key_differs_per_namespace() {
        assert_ne!(
            composite_key("app", "[DEFAULT]", "firebase", "settings"),
            composite_key("app", "[DEFAULT]", "other", "settings"),
        );
    }
}
