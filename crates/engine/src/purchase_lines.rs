//! Product line items of a purchase.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub unit_price_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchase_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchases::Entity",
        from = "Column::PurchaseId",
        to = "super::purchases::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Purchase,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Product,
}

impl Related<super::purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(purchase_id: Uuid, line: &PurchaseLine) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(line.id.to_string()),
        purchase_id: ActiveValue::Set(purchase_id.to_string()),
        product_id: ActiveValue::Set(line.product_id.to_string()),
        quantity: ActiveValue::Set(line.quantity),
        unit_price_minor: ActiveValue::Set(line.unit_price_minor),
    }
}

impl TryFrom<Model> for PurchaseLine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "purchase line")?,
            product_id: parse_uuid(&model.product_id, "product")?,
            quantity: model.quantity,
            unit_price_minor: model.unit_price_minor,
        })
    }
}
