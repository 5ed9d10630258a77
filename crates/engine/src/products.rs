//! Products sold from stock.
//!
//! `quantity` is the units on hand. It only changes through sales, purchases
//! and explicit product edits, and never drops below zero.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub quantity: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub quantity: i64,
    pub active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_product_lines::Entity")]
    SaleLines,
    #[sea_orm(has_many = "super::purchase_lines::Entity")]
    PurchaseLines,
}

impl Related<super::sale_product_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleLines.def()
    }
}

impl Related<super::purchase_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Product> for ActiveModel {
    fn from(product: &Product) -> Self {
        Self {
            id: ActiveValue::Set(product.id.to_string()),
            user_id: ActiveValue::Set(product.user_id.clone()),
            name: ActiveValue::Set(product.name.clone()),
            description: ActiveValue::Set(product.description.clone()),
            price_minor: ActiveValue::Set(product.price_minor),
            quantity: ActiveValue::Set(product.quantity),
            active: ActiveValue::Set(product.active),
            created_at: ActiveValue::Set(product.created_at),
        }
    }
}

impl TryFrom<Model> for Product {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "product")?,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            price_minor: model.price_minor,
            quantity: model.quantity,
            active: model.active,
            created_at: model.created_at,
        })
    }
}
