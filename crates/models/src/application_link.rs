use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::canonical_user;
use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "application_link")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub application_id: String,
    pub created_at: DateTimeWithTimeZone,
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

/// Record that `user_id` registered under `application_id`; no-op if present.
pub async fn ensure(db: &DatabaseConnection, user_id: &str, application_id: &str) -> Result<Model, ModelError> {
    if application_id.trim().is_empty() {
        return Err(ModelError::Validation("application id required".into()));
    }
    if let Some(existing) = Entity::find()
        .filter(Column::UserId.eq(user_id.to_string()))
        .filter(Column::ApplicationId.eq(application_id.to_string()))
        .one(db)
        .await? {
        return Ok(existing);
    }
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id.to_string()),
        application_id: Set(application_id.to_string()),
        created_at: Set(Utc::now().into()),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}
