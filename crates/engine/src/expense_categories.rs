//! Categories used to classify expenses.

use sea_orm::{ActiveValue, entity::prelude::*};

use crate::{Category, CategoryKind, EngineError, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub name_norm: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn active_model(category: &Category, name_norm: String) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(category.id.to_string()),
        user_id: ActiveValue::Set(category.user_id.clone()),
        name: ActiveValue::Set(category.name.clone()),
        name_norm: ActiveValue::Set(name_norm),
        created_at: ActiveValue::Set(category.created_at),
    }
}

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "category")?,
            user_id: model.user_id,
            kind: CategoryKind::Expense,
            name: model.name,
            created_at: model.created_at,
        })
    }
}
