//! Services: sellable items without stock.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_service_lines::Entity")]
    SaleLines,
}

impl Related<super::sale_service_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Service> for ActiveModel {
    fn from(service: &Service) -> Self {
        Self {
            id: ActiveValue::Set(service.id.to_string()),
            user_id: ActiveValue::Set(service.user_id.clone()),
            name: ActiveValue::Set(service.name.clone()),
            description: ActiveValue::Set(service.description.clone()),
            price_minor: ActiveValue::Set(service.price_minor),
            active: ActiveValue::Set(service.active),
            created_at: ActiveValue::Set(service.created_at),
        }
    }
}

impl TryFrom<Model> for Service {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "service")?,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            price_minor: model.price_minor,
            active: model.active,
            created_at: model.created_at,
        })
    }
}
