//! Product line items of a sale.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleProductLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    pub price_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_product_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales::Entity",
        from = "Column::SaleId",
        to = "super::sales::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Sale,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Product,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(sale_id: Uuid, line: &SaleProductLine) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(line.id.to_string()),
        sale_id: ActiveValue::Set(sale_id.to_string()),
        product_id: ActiveValue::Set(line.product_id.to_string()),
        quantity: ActiveValue::Set(line.quantity),
        price_minor: ActiveValue::Set(line.price_minor),
    }
}

impl TryFrom<Model> for SaleProductLine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "sale line")?,
            product_id: parse_uuid(&model.product_id, "product")?,
            quantity: model.quantity,
            price_minor: model.price_minor,
        })
    }
}
