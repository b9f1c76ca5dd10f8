use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::canonical_user;
use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "linked_provider")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub provider_name: String,
    pub provider_subject_id: String,
    pub linked_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { CanonicalUser }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::CanonicalUser => Entity::belongs_to(canonical_user::Entity)
                .from(Column::UserId)
                .to(canonical_user::Column::Id)
                .into(),
        }
    }
}

impl Related<canonical_user::Entity> for Entity {
    fn to() -> RelationDef { Relation::CanonicalUser.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn list_for_user(db: &DatabaseConnection, user_id: &str) -> Result<Vec<Model>, ModelError> {
    let rows = Entity::find()
        .filter(Column::UserId.eq(user_id.to_string()))
        .all(db)
        .await?;
    Ok(rows)
}

/// Attach a provider identity to a user. Returns `false` without writing
/// when the exact pair is already linked.
pub async fn link(
    db: &DatabaseConnection,
    user_id: &str,
    provider_name: &str,
    provider_subject_id: &str,
) -> Result<bool, ModelError> {
    if provider_name.trim().is_empty() || provider_subject_id.trim().is_empty() {
        return Err(ModelError::Validation("provider name and subject id required".into()));
    }
    let existing = Entity::find()
        .filter(Column::UserId.eq(user_id.to_string()))
        .filter(Column::ProviderName.eq(provider_name.to_string()))
        .filter(Column::ProviderSubjectId.eq(provider_subject_id.to_string()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(false);
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id.to_string()),
        provider_name: Set(provider_name.to_string()),
        provider_subject_id: Set(provider_subject_id.to_string()),
        linked_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))?;
    Ok(true)
}
