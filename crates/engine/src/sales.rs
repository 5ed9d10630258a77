//! Sales of products, services, or both.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, SaleProductLine, SaleServiceLine,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleKind {
    /// Only product lines.
    #[serde(rename = "producto")]
    Product,
    /// Only service lines.
    #[serde(rename = "servicio")]
    Service,
    /// At least one line of each.
    #[serde(rename = "mixta")]
    Mixed,
}

impl SaleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Product => "producto",
            Self::Service => "servicio",
            Self::Mixed => "mixta",
        }
    }
}

impl TryFrom<&str> for SaleKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "producto" => Ok(Self::Product),
            "servicio" => Ok(Self::Service),
            "mixta" => Ok(Self::Mixed),
            other => Err(EngineError::invalid(
                "kind",
                format!("invalid sale kind: {other}"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub user_id: String,
    pub client_id: Option<Uuid>,
    /// Name of the linked client, filled on reads.
    pub client_name: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub kind: SaleKind,
    pub product_lines: Vec<SaleProductLine>,
    pub service_lines: Vec<SaleServiceLine>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub client_id: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub kind: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Client,
    #[sea_orm(has_many = "super::sale_product_lines::Entity")]
    ProductLines,
    #[sea_orm(has_many = "super::sale_service_lines::Entity")]
    ServiceLines,
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::sale_product_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductLines.def()
    }
}

impl Related<super::sale_service_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Sale> for ActiveModel {
    fn from(sale: &Sale) -> Self {
        Self {
            id: ActiveValue::Set(sale.id.to_string()),
            user_id: ActiveValue::Set(sale.user_id.clone()),
            client_id: ActiveValue::Set(sale.client_id.map(|id| id.to_string())),
            occurred_at: ActiveValue::Set(sale.occurred_at),
            amount_minor: ActiveValue::Set(sale.amount_minor),
            kind: ActiveValue::Set(sale.kind.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Sale {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "sale")?,
            user_id: model.user_id,
            client_id: parse_optional_uuid(model.client_id.as_deref(), "client")?,
            client_name: None,
            occurred_at: model.occurred_at,
            amount_minor: model.amount_minor,
            kind: SaleKind::try_from(model.kind.as_str())?,
            product_lines: Vec::new(),
            service_lines: Vec::new(),
        })
    }
}
