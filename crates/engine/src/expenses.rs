//! Expenses: money paid out.
//!
//! `category` is the free-text label shown in reports; `category_id` is an
//! optional link to an expense category. Expenses created by a purchase carry
//! `purchase_id` and are owned by that purchase.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError,
    util::{parse_optional_uuid, parse_uuid},
};

/// Free-text category given to the expense mirrored from a purchase.
pub const PURCHASE_EXPENSE_CATEGORY: &str = "Compra";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub category: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub purchase_id: Option<Uuid>,
}

impl Expense {
    /// Mirror of a purchase. Such an expense has no movement of its own and
    /// only changes through its purchase.
    pub fn is_purchase_linked(&self) -> bool {
        self.purchase_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub category: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub purchase_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expense_categories::Entity",
        from = "Column::CategoryId",
        to = "super::expense_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::purchases::Entity",
        from = "Column::PurchaseId",
        to = "super::purchases::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Purchase,
}

impl Related<super::expense_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::purchases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Purchase.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            user_id: ActiveValue::Set(expense.user_id.clone()),
            occurred_at: ActiveValue::Set(expense.occurred_at),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            category: ActiveValue::Set(expense.category.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            category_id: ActiveValue::Set(expense.category_id.map(|id| id.to_string())),
            purchase_id: ActiveValue::Set(expense.purchase_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            user_id: model.user_id,
            occurred_at: model.occurred_at,
            amount_minor: model.amount_minor,
            category: model.category,
            description: model.description,
            category_id: parse_optional_uuid(model.category_id.as_deref(), "category")?,
            purchase_id: parse_optional_uuid(model.purchase_id.as_deref(), "purchase")?,
        })
    }
}
