//! Incomes: money received outside of sales.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError,
    util::{parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Income {
    pub id: Uuid,
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    /// Name of the linked category, filled on reads.
    pub category_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "incomes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::income_categories::Entity",
        from = "Column::CategoryId",
        to = "super::income_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Category,
}

impl Related<super::income_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Income> for ActiveModel {
    fn from(income: &Income) -> Self {
        Self {
            id: ActiveValue::Set(income.id.to_string()),
            user_id: ActiveValue::Set(income.user_id.clone()),
            occurred_at: ActiveValue::Set(income.occurred_at),
            amount_minor: ActiveValue::Set(income.amount_minor),
            description: ActiveValue::Set(income.description.clone()),
            category_id: ActiveValue::Set(income.category_id.map(|id| id.to_string())),
        }
    }
}

impl TryFrom<Model> for Income {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "income")?,
            user_id: model.user_id,
            occurred_at: model.occurred_at,
            amount_minor: model.amount_minor,
            description: model.description,
            category_id: parse_optional_uuid(model.category_id.as_deref(), "category")?,
            category_name: None,
        })
    }
}
