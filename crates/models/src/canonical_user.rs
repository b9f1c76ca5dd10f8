use sea_orm::{entity::prelude::*, Set, DatabaseConnection, QueryOrder};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{application_link, linked_provider};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "canonical_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    LinkedProvider,
    ApplicationLink,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::LinkedProvider => Entity::has_many(linked_provider::Entity).into(),
            Relation::ApplicationLink => Entity::has_many(application_link::Entity).into(),
        }
    }
}

impl Related<linked_provider::Entity> for Entity {
    fn to() -> RelationDef { Relation::LinkedProvider.def() }
}

impl Related<application_link::Entity> for Entity {
    fn to() -> RelationDef { Relation::ApplicationLink.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    if !email.contains('@') { return Err(ModelError::Validation("invalid email".into())); }
    Ok(())
}

/// Oldest user with this email. Duplicates can exist after a first-touch
/// race; the earliest record is the one linking attaches to.
pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<Model>, ModelError> {
    let found = Entity::find()
        .filter(Column::Email.eq(email.to_string()))
        .order_by_asc(Column::CreatedAt)
        .one(db)
        .await?;
    Ok(found)
}

pub async fn find_by_id(db: &DatabaseConnection, id: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id.to_string()).one(db).await?)
}

/// Like `find_by_id`, but a missing row is `ModelError::NotFound`.
pub async fn get_by_id(db: &DatabaseConnection, id: &str) -> Result<Model, ModelError> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("canonical user {id}")))
}

pub async fn create(
    db: &DatabaseConnection,
    id: &str,
    email: &str,
    display_name: Option<&str>,
    phone_number: Option<&str>,
) -> Result<Model, ModelError> {
    validate_email(email)?;
    if id.trim().is_empty() { return Err(ModelError::Validation("user id required".into())); }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(id.to_string()),
        email: Set(email.to_string()),
        display_name: Set(display_name.map(str::to_string)),
        phone_number: Set(phone_number.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(|e| ModelError::Db(e.to_string()))
}

pub async fn hard_delete(db: &DatabaseConnection, id: &str) -> Result<(), ModelError> {
    Entity::delete_by_id(id.to_string()).exec(db).await?;
    Ok(())
}
