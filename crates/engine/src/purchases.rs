//! Purchases of stock from suppliers.
//!
//! Every purchase owns one mirrored expense (`expense_id`) whose amount and
//! date follow the purchase.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, PurchaseLine,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: String,
    pub supplier_id: Option<Uuid>,
    /// Name of the linked supplier, filled on reads.
    pub supplier_name: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub lines: Vec<PurchaseLine>,
    pub expense_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub supplier_id: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::suppliers::Entity",
        from = "Column::SupplierId",
        to = "super::suppliers::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Supplier,
    #[sea_orm(has_many = "super::purchase_lines::Entity")]
    Lines,
    #[sea_orm(has_one = "super::expenses::Entity")]
    Expense,
}

impl Related<super::suppliers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::purchase_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Purchase> for ActiveModel {
    fn from(purchase: &Purchase) -> Self {
        Self {
            id: ActiveValue::Set(purchase.id.to_string()),
            user_id: ActiveValue::Set(purchase.user_id.clone()),
            supplier_id: ActiveValue::Set(purchase.supplier_id.map(|id| id.to_string())),
            occurred_at: ActiveValue::Set(purchase.occurred_at),
            amount_minor: ActiveValue::Set(purchase.amount_minor),
            description: ActiveValue::Set(purchase.description.clone()),
        }
    }
}

impl TryFrom<Model> for Purchase {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "purchase")?,
            user_id: model.user_id,
            supplier_id: parse_optional_uuid(model.supplier_id.as_deref(), "supplier")?,
            supplier_name: None,
            occurred_at: model.occurred_at,
            amount_minor: model.amount_minor,
            description: model.description,
            lines: Vec::new(),
            expense_id: None,
        })
    }
}
