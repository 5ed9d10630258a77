//! Suppliers the business purchases stock from.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchases::Entity")]
    Purchases,
}

impl Related<super::purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchases.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Supplier> for ActiveModel {
    fn from(supplier: &Supplier) -> Self {
        Self {
            id: ActiveValue::Set(supplier.id.to_string()),
            user_id: ActiveValue::Set(supplier.user_id.clone()),
            name: ActiveValue::Set(supplier.name.clone()),
            phone: ActiveValue::Set(supplier.phone.clone()),
            email: ActiveValue::Set(supplier.email.clone()),
            address: ActiveValue::Set(supplier.address.clone()),
            created_at: ActiveValue::Set(supplier.created_at),
        }
    }
}

impl TryFrom<Model> for Supplier {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "supplier")?,
            user_id: model.user_id,
            name: model.name,
            phone: model.phone,
            email: model.email,
            address: model.address,
            created_at: model.created_at,
        })
    }
}
