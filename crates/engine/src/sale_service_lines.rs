//! Service line items of a sale.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleServiceLine {
    pub id: Uuid,
    pub service_id: Uuid,
    pub quantity: i64,
    pub price_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sale_service_lines")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sale_id: String,
    pub service_id: String,
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
        belongs_to = "super::services::Entity",
        from = "Column::ServiceId",
        to = "super::services::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Service,
}

impl Related<super::sales::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sale.def()
    }
}

impl Related<super::services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(sale_id: Uuid, line: &SaleServiceLine) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(line.id.to_string()),
        sale_id: ActiveValue::Set(sale_id.to_string()),
        service_id: ActiveValue::Set(line.service_id.to_string()),
        quantity: ActiveValue::Set(line.quantity),
        price_minor: ActiveValue::Set(line.price_minor),
    }
}

impl TryFrom<Model> for SaleServiceLine {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "sale line")?,
            service_id: parse_uuid(&model.service_id, "service")?,
            quantity: model.quantity,
            price_minor: model.price_minor,
        })
    }
}
